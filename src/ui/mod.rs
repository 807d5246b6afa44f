pub mod layout;
pub mod popup;
pub mod theme;
pub mod widget;
pub mod widgets;
