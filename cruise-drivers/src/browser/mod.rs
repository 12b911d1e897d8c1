pub mod driver;
pub mod host;
pub mod stealth;

pub use driver::CruiseDriver;
pub use host::WebDriverHost;
