//! The fixed main menu and the canned replies the bot sends.

use mb_channels::{MenuButton, OutboundContent};

pub const MENU_KEYWORD: &str = "menu";

pub const MENU_HEADER: &str = "📋 *Menú principal*\nSelecciona una opción:";

pub const GREETING: &str = "👋 ¡Hola! Escribe *menu* para ver las opciones.";

pub const UNRECOGNIZED_OPTION: &str =
    "😅 No entiendo esa opción. Escribe *menu* para ver las opciones nuevamente.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MenuOption {
    Information,
    Hours,
    Contact,
}

impl MenuOption {
    /// Rendering order of the menu buttons.
    pub const ALL: [MenuOption; 3] = [Self::Information, Self::Hours, Self::Contact];

    pub fn id(self) -> &'static str {
        match self {
            Self::Information => "1",
            Self::Hours => "2",
            Self::Contact => "3",
        }
    }

    /// Display title. The platform echoes this back on a selection, so it is
    /// also the matching key.
    pub fn title(self) -> &'static str {
        match self {
            Self::Information => "💡 Información",
            Self::Hours => "🕒 Horarios",
            Self::Contact => "📞 Contacto",
        }
    }

    pub fn response(self) -> &'static str {
        match self {
            Self::Information => {
                "Somos un bot de prueba para WhatsApp API 😎\nPuedes pedirme horarios o contacto."
            }
            Self::Hours => "🕓 Atendemos de lunes a viernes, de 8am a 6pm.",
            Self::Contact => "📞 Puedes escribirnos a soporte@midominio.com o al +57 300 123 4567.",
        }
    }

    /// Exact, case-sensitive title lookup.
    pub fn from_title(title: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|option| option.title() == title)
    }

    pub fn button(self) -> MenuButton {
        MenuButton::new(self.id(), self.title())
    }
}

pub fn menu_content() -> OutboundContent {
    OutboundContent::InteractiveMenu {
        body: MENU_HEADER.to_string(),
        buttons: MenuOption::ALL.into_iter().map(MenuOption::button).collect(),
    }
}
