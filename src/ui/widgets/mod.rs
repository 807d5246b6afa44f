pub mod button;
pub mod checkbox_menu;
pub mod form;
pub mod scroll_menu;
pub mod text_input;
