pub mod document;
pub mod span;

pub use document::Document;
pub use span::{Aspect, AspectGroup, AspectGroups, Mention, Span};
