pub mod icons;
pub mod output;
pub mod table;

pub use icons::Icons;
pub use output::{dim, error, header, info, section, success, warn};
pub use table::{submissions_table, TableBuilder};
