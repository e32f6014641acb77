use std::io::{BufRead, Write};

use tracing::warn;

use crate::crawler::{Progress, ProgressSink};
use crate::display::{ManualArticleView, ProgressBar, ReportView, TitleList};
use crate::error::{ServiceError, StoreError};
use crate::fetcher::FeedFetcher;
use crate::overlay::ManualReport;
use crate::service::Aggregator;

const NO_REPORT_YET: &str = "Chưa có báo cáo crawl tin nào. Vui lòng crawl tin trước.";
const INVALID_SELECTION: &str = "Số thứ tự không hợp lệ, vui lòng thử lại.";
const END_OF_OPINION: &str = "--";

/// Redraws a progress bar on stderr.
pub struct TerminalProgress;

impl ProgressSink for TerminalProgress {
    fn on_progress(&self, progress: Progress) {
        let mut stderr = std::io::stderr().lock();
        let _ = write!(stderr, "\r{}", ProgressBar(progress));
        if progress.completed >= progress.total {
            let _ = writeln!(stderr);
        }
        let _ = stderr.flush();
    }
}

/// Line-based interactive menu over any reader/writer pair.
pub struct Menu<'a, F, R, W> {
    aggregator: &'a Aggregator<F>,
    progress: Box<dyn ProgressSink + 'a>,
    input: R,
    output: W,
    unsaved: Option<ManualReport>,
}

impl<'a, F, R, W> Menu<'a, F, R, W>
where
    F: FeedFetcher,
    R: BufRead,
    W: Write,
{
    pub fn new(aggregator: &'a Aggregator<F>, input: R, output: W) -> Self {
        Self {
            aggregator,
            progress: Box::new(TerminalProgress),
            input,
            output,
            unsaved: None,
        }
    }

    pub fn with_progress(mut self, progress: impl ProgressSink + 'a) -> Self {
        self.progress = Box::new(progress);
        self
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// Run until the operator picks `0` or input ends.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        loop {
            self.print_menu()?;
            let Some(choice) = self.read_line()? else {
                return Ok(());
            };

            match choice.trim() {
                "1" => self.run_crawl().await?,
                "2" => self.show_current_report().await?,
                "3" => self.start_manual_overlay().await?,
                "4" => self.show_manual_report().await?,
                "0" => {
                    writeln!(self.output, "Thoát chương trình.")?;
                    return Ok(());
                }
                _ => writeln!(self.output, "Lựa chọn không hợp lệ, vui lòng thử lại.")?,
            }
            writeln!(self.output)?;
        }
    }

    fn print_menu(&mut self) -> std::io::Result<()> {
        writeln!(self.output, "Chọn mục:")?;
        writeln!(self.output, "1 - Bắt đầu crawl tin")?;
        writeln!(self.output, "2 - Trích xuất báo cáo tin đã crawl")?;
        writeln!(self.output, "3 - Cập nhật thủ công báo cáo")?;
        writeln!(self.output, "4 - Trích xuất báo cáo tổng (báo cáo thủ công mới nhất)")?;
        writeln!(self.output, "0 - Thoát")?;
        write!(self.output, "Nhập lựa chọn: ")?;
        self.output.flush()
    }

    /// One line without its terminator, or `None` at end of input.
    fn read_line(&mut self) -> std::io::Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end_matches(['\r', '\n']).len();
        line.truncate(trimmed);
        Ok(Some(line))
    }

    async fn run_crawl(&mut self) -> anyhow::Result<()> {
        writeln!(self.output, "Đang bắt đầu crawl tin...")?;
        self.output.flush()?;

        match self.aggregator.run_crawl(self.progress.as_ref()).await {
            Ok(report) => {
                // An unsaved session belongs to the report just replaced.
                if self.unsaved.take().is_some() {
                    warn!("Discarding unsaved manual report from the previous crawl");
                }
                write!(self.output, "{}", ReportView(&report))?
            }
            Err(ServiceError::CrawlInProgress) => {
                writeln!(self.output, "Hệ thống đang crawl tin, vui lòng đợi.")?
            }
            Err(e) => writeln!(self.output, "Lỗi khi crawl tin: {}", e)?,
        }
        Ok(())
    }

    async fn show_current_report(&mut self) -> anyhow::Result<()> {
        match self.aggregator.current_report().await {
            Ok(report) => write!(self.output, "{}", ReportView(&report))?,
            Err(_) => writeln!(self.output, "{}", NO_REPORT_YET)?,
        }
        Ok(())
    }

    async fn start_manual_overlay(&mut self) -> anyhow::Result<()> {
        let mut manual = match self.unsaved.take() {
            Some(manual) => {
                writeln!(self.output, "Tiếp tục phiên cập nhật chưa được lưu.")?;
                manual
            }
            None => match self.aggregator.start_manual_overlay().await {
                Ok(manual) => manual,
                Err(_) => {
                    writeln!(self.output, "{}", NO_REPORT_YET)?;
                    return Ok(());
                }
            },
        };

        self.edit_loop(&mut manual)?;

        let path = self.aggregator.store().path().display().to_string();
        match self.aggregator.save_manual_report(&manual).await {
            Ok(()) => writeln!(
                self.output,
                "Đã lưu báo cáo cập nhật thủ công vào file: {}",
                path
            )?,
            Err(e) => {
                warn!("Keeping unsaved manual report in memory: {}", e);
                writeln!(self.output, "Lỗi khi lưu báo cáo thủ công: {}", e)?;
                self.unsaved = Some(manual);
            }
        }
        Ok(())
    }

    fn edit_loop(&mut self, manual: &mut ManualReport) -> anyhow::Result<()> {
        loop {
            writeln!(self.output, "\n=== Danh sách các tin đã crawl ===")?;
            write!(self.output, "{}", TitleList(&manual.articles[..]))?;
            writeln!(self.output, "Nhập số thứ tự tin muốn cập nhật (0 để thoát):")?;

            let Some(input) = self.read_line()? else {
                return Ok(());
            };
            let index = match manual.select(&input) {
                Ok(Some(index)) => index,
                Ok(None) => return Ok(()),
                Err(_) => {
                    writeln!(self.output, "{}", INVALID_SELECTION)?;
                    continue;
                }
            };

            writeln!(self.output, "\nTiêu đề tin: {}", manual.articles[index].article.title)?;
            write!(self.output, "Nhập Tóm tắt ngắn gọn (tiếng Việt): ")?;
            self.output.flush()?;
            let summary = self.read_line()?.unwrap_or_default().trim().to_string();
            let opinion = self.read_multiline("Nhập Nhận định (tiếng Việt)")?;

            manual.annotate(index, summary, opinion)?;
            writeln!(self.output, "Đã cập nhật tin thứ {} thành công.", index + 1)?;
        }
    }

    fn read_multiline(&mut self, prompt: &str) -> std::io::Result<String> {
        writeln!(
            self.output,
            "{} (Nhập {} rồi Enter để kết thúc):",
            prompt, END_OF_OPINION
        )?;
        let mut lines = Vec::new();
        while let Some(line) = self.read_line()? {
            if line == END_OF_OPINION {
                break;
            }
            lines.push(line);
        }
        Ok(lines.join("\n"))
    }

    async fn show_manual_report(&mut self) -> anyhow::Result<()> {
        let manual = match self.aggregator.load_manual_report().await {
            Ok(manual) => manual,
            Err(ServiceError::Store(e @ StoreError::NotFound { .. })) => {
                writeln!(self.output, "Chưa có báo cáo cập nhật thủ công: {}", e)?;
                return Ok(());
            }
            Err(e) => {
                writeln!(self.output, "Lỗi khi đọc báo cáo cập nhật thủ công: {}", e)?;
                return Ok(());
            }
        };

        loop {
            writeln!(self.output, "\n=== Báo cáo tổng đã cập nhật thủ công ===")?;
            write!(self.output, "{}", TitleList(&manual.articles[..]))?;
            writeln!(self.output, "Nhập số thứ tự muốn xem chi tiết (0 để thoát):")?;

            let Some(input) = self.read_line()? else {
                return Ok(());
            };
            match manual.select(&input) {
                Ok(Some(index)) => {
                    write!(self.output, "\n{}", ManualArticleView(&manual.articles[index]))?
                }
                Ok(None) => return Ok(()),
                Err(_) => writeln!(self.output, "{}", INVALID_SELECTION)?,
            }
        }
    }
}
