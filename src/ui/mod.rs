//! Terminal menus, screen formatting and the stdout player view.

mod app;
pub(crate) mod formatting;
pub(crate) mod terminal_view;

pub use app::App;
pub use terminal_view::TerminalView;
