//! Browser stand-in for running the router from a terminal: no tabs, no
//! screen, no popup.

use swatchsheet_router::{BrowserPlatform, Tab};

pub struct Headless;

impl BrowserPlatform for Headless {
    fn active_tab(&self) -> Option<Tab> {
        None
    }

    fn capture_visible_tab(&self) -> Result<String, String> {
        Err("no browser attached".into())
    }

    fn inject_picker(&self, _tab_id: u32) -> Result<(), String> {
        Err("no browser attached".into())
    }

    fn open_popup(&self) -> Result<(), String> {
        Err("no browser attached".into())
    }
}
