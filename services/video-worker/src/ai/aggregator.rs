use super::AnalysisClient;
use crate::models::AiResult;
use regex::Regex;
use std::sync::{Arc, OnceLock};
use tracing::{info, warn};

const SUMMARY_INSTRUCTIONS: &str = "You combine several frame-by-frame analyses of one plant \
video into a single analysis. Below are the individual frame analyses. Write one consolidated \
summary that keeps the key findings across all frames, using the same two sections, \
\"Health Analysis:\" and \"Growth Analysis:\".";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Health,
    Growth,
}

fn section_markers() -> &'static Regex {
    static MARKERS: OnceLock<Regex> = OnceLock::new();
    MARKERS.get_or_init(|| {
        Regex::new(r"(?i)(health|growth) analysis:").expect("section marker pattern is valid")
    })
}

/// Merges per-frame analyses into one result through the analysis client.
#[derive(Clone)]
pub struct AiResultAggregator {
    client: Arc<dyn AnalysisClient>,
}

impl AiResultAggregator {
    pub fn new(client: Arc<dyn AnalysisClient>) -> Self {
        Self { client }
    }

    /// Zero frames give an empty result. If summarization fails the first
    /// frame's result is returned unchanged.
    pub async fn aggregate(&self, results: &[AiResult]) -> AiResult {
        let Some(first) = results.first() else {
            return AiResult::default();
        };

        let prompt = build_summary_prompt(results);
        match self.client.summarize(&prompt).await {
            Ok(text) => {
                info!("Aggregated analysis of {} frames", results.len());
                parse_sections(&text)
            }
            Err(e) => {
                warn!("Aggregation failed, falling back to first frame: {}", e);
                first.clone()
            }
        }
    }
}

/// The prompt sent for summarization: instructions followed by every frame.
pub fn build_summary_prompt(results: &[AiResult]) -> String {
    let frames = results
        .iter()
        .enumerate()
        .map(|(index, result)| {
            format!(
                "Frame {}:\nHealth Analysis:\n{}\n\nGrowth Analysis:\n{}\n-------------------",
                index + 1,
                result
                    .health_analysis
                    .as_deref()
                    .unwrap_or("No health analysis"),
                result
                    .growth_analysis
                    .as_deref()
                    .unwrap_or("No growth analysis"),
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!("{}\n\n{}", SUMMARY_INSTRUCTIONS, frames)
}

/// Split model output on its `Health Analysis:` / `Growth Analysis:`
/// markers (any case). The last occurrence of each marker wins, so a summary
/// that repeats the per-frame layout yields its final block. A section runs
/// to the next marker or the end of the text.
pub fn parse_sections(text: &str) -> AiResult {
    let markers: Vec<(Section, usize, usize)> = section_markers()
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let section = if caps[1].eq_ignore_ascii_case("health") {
                Section::Health
            } else {
                Section::Growth
            };
            Some((section, whole.start(), whole.end()))
        })
        .collect();

    let body = |wanted: Section| -> Option<String> {
        let position = markers.iter().rposition(|(section, _, _)| *section == wanted)?;
        let (_, _, body_start) = markers[position];
        let body_end = markers
            .get(position + 1)
            .map(|(_, start, _)| *start)
            .unwrap_or(text.len());
        clean_section(&text[body_start..body_end])
    };

    AiResult {
        health_analysis: body(Section::Health),
        growth_analysis: body(Section::Growth),
    }
}

fn is_markup_only(line: &str) -> bool {
    line.chars().all(|c| c == '*' || c == '#' || c.is_whitespace())
}

/// Trim a raw section body. Only the emphasis closing the marker itself
/// (`**Health Analysis:**`) and a final line holding nothing but the next
/// marker's `#`/`*` prefix are removed; markup inside the text is kept.
fn clean_section(raw: &str) -> Option<String> {
    let mut content = raw.trim_start_matches('*').trim();
    if let Some((head, last)) = content.rsplit_once('\n') {
        if is_markup_only(last) {
            content = head.trim_end();
        }
    } else if is_markup_only(content) {
        content = "";
    }
    (!content.is_empty()).then(|| content.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{PipelineError, PipelineResult};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct ScriptedClient {
        reply: Option<String>,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl AnalysisClient for ScriptedClient {
        async fn analyze_image(&self, _image_url: &str) -> PipelineResult<AiResult> {
            unreachable!()
        }

        async fn summarize(&self, prompt: &str) -> PipelineResult<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.reply
                .clone()
                .ok_or_else(|| PipelineError::Analysis("endpoint down".to_string()))
        }
    }

    fn frame(health: &str, growth: &str) -> AiResult {
        AiResult {
            health_analysis: Some(health.to_string()),
            growth_analysis: Some(growth.to_string()),
        }
    }

    fn aggregator(reply: Option<&str>) -> (AiResultAggregator, Arc<ScriptedClient>) {
        let client = Arc::new(ScriptedClient {
            reply: reply.map(str::to_string),
            prompts: Mutex::new(Vec::new()),
        });
        (AiResultAggregator::new(client.clone()), client)
    }

    #[tokio::test]
    async fn zero_frames_is_empty_not_an_error() {
        let (aggregator, client) = aggregator(Some("unused"));
        let result = aggregator.aggregate(&[]).await;
        assert!(result.is_empty());
        assert!(client.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn summary_failure_falls_back_to_first_frame() {
        let (aggregator, _) = aggregator(None);
        let frames = [
            frame("spots on two leaves", "9 leaves"),
            frame("healthy", "10 leaves"),
            frame("healthy", "10 leaves, 30cm"),
        ];

        let result = aggregator.aggregate(&frames).await;
        assert_eq!(result, frames[0]);
    }

    #[tokio::test]
    async fn summary_is_split_into_sections() {
        let reply = "Health Analysis:\nMild leaf spot, treat with copper fungicide.\n\n\
                     Growth Analysis:\nAbout 10 leaves, 30 cm tall.";
        let (aggregator, client) = aggregator(Some(reply));

        let result = aggregator
            .aggregate(&[frame("a", "b"), frame("c", "d")])
            .await;

        assert_eq!(
            result.health_analysis.as_deref(),
            Some("Mild leaf spot, treat with copper fungicide.")
        );
        assert_eq!(result.growth_analysis.as_deref(), Some("About 10 leaves, 30 cm tall."));

        let prompts = client.prompts.lock().unwrap();
        assert!(prompts[0].contains("Frame 1:\nHealth Analysis:\na"));
        assert!(prompts[0].contains("Frame 2:\nHealth Analysis:\nc"));
    }

    #[test]
    fn markers_are_case_insensitive_and_markdown_tolerant() {
        let result = parse_sections("**HEALTH ANALYSIS:** fine\n### growth analysis: 12 leaves");
        assert_eq!(result.health_analysis.as_deref(), Some("fine"));
        assert_eq!(result.growth_analysis.as_deref(), Some("12 leaves"));
    }

    #[test]
    fn repeated_frame_layout_keeps_final_block() {
        let result = parse_sections(
            "Frame 1:\nHealth Analysis: A\nGrowth Analysis: B\n\
             Frame 2:\nHealth Analysis: C\nGrowth Analysis: D",
        );
        assert_eq!(result.health_analysis.as_deref(), Some("C"));
        assert_eq!(result.growth_analysis.as_deref(), Some("D"));
    }

    #[test]
    fn markup_inside_a_section_is_kept() {
        let result = parse_sections(
            "Health Analysis:\n**Leaf spot** on 2 leaves, apply fungicide #3\n\
             Growth Analysis:\n10 leaves*",
        );
        assert_eq!(
            result.health_analysis.as_deref(),
            Some("**Leaf spot** on 2 leaves, apply fungicide #3")
        );
        assert_eq!(result.growth_analysis.as_deref(), Some("10 leaves*"));
    }

    #[test]
    fn growth_before_health_still_splits() {
        let result = parse_sections("Growth Analysis: tall\nHealth Analysis: wilting");
        assert_eq!(result.health_analysis.as_deref(), Some("wilting"));
        assert_eq!(result.growth_analysis.as_deref(), Some("tall"));
    }

    #[test]
    fn missing_markers_leave_fields_unset() {
        assert!(parse_sections("The plant looks fine overall.").is_empty());

        let only_health = parse_sections("Health Analysis: ok");
        assert_eq!(only_health.health_analysis.as_deref(), Some("ok"));
        assert!(only_health.growth_analysis.is_none());
    }

    #[test]
    fn prompt_marks_missing_halves() {
        let prompt = build_summary_prompt(&[AiResult::default()]);
        assert!(prompt.contains("No health analysis"));
        assert!(prompt.contains("No growth analysis"));
    }
}
