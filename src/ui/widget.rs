use super::layout::GridRegion;

/// Unique widget identifier, assigned monotonically by the grid layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WidgetId(pub u32);

/// Shared state every placed widget carries: identity, display title, grid
/// region, bottom-bar help text and whether it can receive key input.
///
/// The region is fixed at construction; title and help text stay mutable so
/// dependent labels (row counts, selection tallies) can be kept in sync.
#[derive(Clone, Debug)]
pub struct WidgetBase {
    pub id: WidgetId,
    pub title: String,
    pub region: GridRegion,
    pub help_text: String,
    focusable: bool,
}

impl WidgetBase {
    pub fn new(id: WidgetId, title: &str, region: GridRegion, focusable: bool) -> Self {
        Self {
            id,
            title: title.to_string(),
            region,
            help_text: String::new(),
            focusable,
        }
    }

    pub fn with_help(mut self, help: &str) -> Self {
        self.help_text = help.to_string();
        self
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn is_focusable(&self) -> bool {
        self.focusable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_is_mutable_region_is_not() {
        let region = GridRegion {
            row: 0,
            col: 0,
            row_span: 1,
            col_span: 1,
        };
        let mut base = WidgetBase::new(WidgetId(7), "Rows", region, true);
        base.set_title("Rows (3 of 9 selected)");
        assert_eq!(base.title, "Rows (3 of 9 selected)");
        assert_eq!(base.region, region);
        assert!(base.is_focusable());
    }
}
