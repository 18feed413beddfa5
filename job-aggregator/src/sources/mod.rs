pub mod feed;
pub mod html_board;
pub mod presets;

pub use feed::FeedSource;
pub use html_board::HtmlBoardSource;
