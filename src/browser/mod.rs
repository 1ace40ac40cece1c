pub mod driver;
pub mod port;

pub use driver::{create_webdriver_client, FantocciniBrowser};
pub use port::{any_present, try_click, try_fill, wait_any_present, BrowserPort, Selector};
