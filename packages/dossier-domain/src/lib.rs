pub mod chunking;
pub mod content;
pub mod discovery;
pub mod fanin;
pub mod status;
pub mod timeline;
