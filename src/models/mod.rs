mod article;
mod day;

pub use article::{Article, ArticleRef, ArticleUpsert, ArticleView, HeadlineEntry, SummaryPatch};
pub use day::{Day, RankedArticle};
