//! Plain-text rendering of reports for the terminal.
//!
//! All views implement [`Display`]; the output is deterministic for a given input.

use std::fmt::{self, Display, Formatter};

use crate::crawler::Progress;
use crate::overlay::ManualArticle;
use crate::report::{Article, Report};

pub const SUMMARY_LIMIT: usize = 300;
pub const TRUNCATION_MARKER: &str = "...";

pub(crate) const COMMENTARY: [&str; 3] = [
    "Đây là bài viết mới gần đây từ nguồn uy tín trong lĩnh vực công nghệ và khởi nghiệp.",
    "Phần tóm tắt cung cấp thông tin cơ bản và hữu ích để cập nhật xu hướng.",
    "Cần đọc kỹ bài đầy đủ để hiểu chi tiết và tác động.",
];

pub(crate) const NO_MANUAL_OPINION: &str = "Chưa có nhận định thủ công.";

const PROGRESS_BAR_WIDTH: usize = 40;

/// Keep the first `limit` characters and mark the cut; shorter text is returned as is.
pub fn trim_summary(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}{}", &text[..cut], TRUNCATION_MARKER),
        None => text.to_string(),
    }
}

/// Crawl statistics followed by one block per article.
pub struct ReportView<'a>(pub &'a Report);

impl Display for ReportView<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let report = self.0;
        write_statistics(f, &report.success_sources, &report.fail_sources)?;

        writeln!(f, "1. Tin mới nhất:")?;
        for (i, article) in report.articles.iter().enumerate() {
            write_article_block(f, i + 1, article)?;
        }

        let crawled = report.success_sources.len() + report.fail_sources.len();
        writeln!(
            f,
            "Đã crawl {} *** đầu báo ***, vui lòng vào mục thống kê để xem chi tiết.",
            crawled
        )?;
        writeln!(f)
    }
}

fn write_statistics(f: &mut Formatter<'_>, success: &[String], fail: &[String]) -> fmt::Result {
    writeln!(f, "0. Thống kê quá trình crawl tin:")?;
    writeln!(f, "Số nguồn crawl thành công: {}", success.len())?;
    writeln!(f, "Số nguồn crawl thất bại: {}", fail.len())?;
    writeln!(f, "Danh sách nguồn crawl thành công: {}", success.join(", "))?;
    writeln!(f, "Danh sách nguồn crawl thất bại: {}", fail.join(", "))?;
    writeln!(f)
}

fn write_article_block(f: &mut Formatter<'_>, number: usize, article: &Article) -> fmt::Result {
    writeln!(f, "{}. Nguồn tin: {}", number, article.source)?;
    writeln!(f, "   Tiêu đề: {}", article.title)?;
    writeln!(f, "   URL: {}", article.url)?;
    writeln!(
        f,
        "   Tóm tắt ngắn gọn: {}",
        trim_summary(&article.summary, SUMMARY_LIMIT)
    )?;
    writeln!(f, "   Nhận định:")?;
    for line in COMMENTARY {
        writeln!(f, "   - {}", line)?;
    }
    writeln!(f)
}

/// Detail view of one overlaid article, preferring the operator's text.
pub struct ManualArticleView<'a>(pub &'a ManualArticle);

impl Display for ManualArticleView<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let manual = self.0;
        let article = &manual.article;
        writeln!(f, "Nguồn tin: {}", article.source)?;
        writeln!(f, "Tiêu đề: {}", article.title)?;
        writeln!(f, "URL: {}", article.url)?;

        match manual.manual_summary() {
            Some(summary) => writeln!(
                f,
                "Tóm tắt ngắn gọn (thủ công): {}",
                trim_summary(summary, SUMMARY_LIMIT)
            )?,
            None => writeln!(
                f,
                "Tóm tắt ngắn gọn: {}",
                trim_summary(&article.summary, SUMMARY_LIMIT)
            )?,
        }

        match manual.manual_opinion() {
            Some(opinion) => writeln!(f, "Nhận định (thủ công):\n{}", opinion)?,
            None => writeln!(f, "Nhận định: {}", NO_MANUAL_OPINION)?,
        }
        writeln!(f)
    }
}

/// Numbered title list used by the selection menus.
pub struct TitleList<'a, I>(pub &'a [I]);

pub trait Titled {
    fn title(&self) -> &str;
}

impl Titled for Article {
    fn title(&self) -> &str {
        &self.title
    }
}

impl Titled for ManualArticle {
    fn title(&self) -> &str {
        &self.article.title
    }
}

impl<I: Titled> Display for TitleList<'_, I> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (i, item) in self.0.iter().enumerate() {
            writeln!(f, "{}: {}", i + 1, item.title())?;
        }
        Ok(())
    }
}

/// Single-line progress bar, meant to be redrawn in place with `\r`.
pub struct ProgressBar(pub Progress);

impl Display for ProgressBar {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let progress = self.0;
        let ratio = progress.ratio().clamp(0.0, 1.0);
        let filled = (ratio * PROGRESS_BAR_WIDTH as f64) as usize;
        let bar = format!(
            "{}{}",
            "█".repeat(filled),
            "░".repeat(PROGRESS_BAR_WIDTH - filled)
        );

        let secs = progress.eta.as_secs();
        write!(
            f,
            "Hệ thống đang lấy tin, tiến độ: [{}] ETA: {:02} phút {:02} giây {}/{} ({:.1}%) ",
            bar,
            secs / 60,
            secs % 60,
            progress.completed,
            progress.total,
            ratio * 100.0
        )
    }
}
