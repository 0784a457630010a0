/// Degrees the arrow indicator turns on each toggle
const ARROW_STEP_DEG: u32 = 180;

/// Dropdown with a single active item and a rotating arrow indicator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropdownMenu<T> {
    open: bool,
    arrow_deg: u32,
    active: T,
}

impl<T: Copy + PartialEq> DropdownMenu<T> {
    pub fn new(active: T) -> Self {
        Self {
            open: false,
            arrow_deg: 0,
            active,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn active(&self) -> T {
        self.active
    }

    /// Accumulated rotation; keeps growing so the indicator always turns
    /// the same way.
    pub fn arrow_rotation(&self) -> u32 {
        self.arrow_deg
    }

    pub fn toggle(&mut self, is_open: bool) {
        self.arrow_deg = self.arrow_deg.wrapping_add(ARROW_STEP_DEG);
        self.open = is_open;
    }

    /// Make `item` active and close the menu. Returns whether the active
    /// item changed.
    pub fn select(&mut self, item: T) -> bool {
        let changed = self.active != item;
        self.active = item;
        self.open = false;
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_rotates_arrow() {
        let mut menu = DropdownMenu::new(1u8);
        menu.toggle(true);
        assert!(menu.is_open());
        assert_eq!(menu.arrow_rotation(), 180);

        menu.toggle(false);
        assert!(!menu.is_open());
        assert_eq!(menu.arrow_rotation(), 360);
    }

    #[test]
    fn test_select_closes_menu() {
        let mut menu = DropdownMenu::new(1u8);
        menu.toggle(true);
        assert!(menu.select(2));
        assert!(!menu.is_open());
        assert_eq!(menu.active(), 2);
        assert!(!menu.select(2));
    }
}
