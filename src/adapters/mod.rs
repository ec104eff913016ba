// Adapters layer: concrete implementations of the domain ports (mapping table, browser, storage, http intake)

pub mod http;
pub mod mapping;
pub mod storage;
pub mod webdriver;

pub use mapping::ServiceTable;
pub use storage::LocalStorage;
pub use webdriver::{WebDriverFactory, WebDriverPage};
