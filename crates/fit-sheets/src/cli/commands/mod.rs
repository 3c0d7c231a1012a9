pub mod merge;
pub mod sync;
pub mod tab;

pub use merge::run as merge_files;
pub use sync::run as sync_run;
pub use tab::show as show_tab;
