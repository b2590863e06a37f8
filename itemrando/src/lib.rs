pub mod randomize;
pub mod settings;
pub mod spoiler_log;
