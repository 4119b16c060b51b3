use crate::error::{PipelineError, PipelineResult};
use crate::media::rendition::MASTER_MANIFEST_NAME;
use crate::media::{MediaEngine, RenditionSpec, generate_master_manifest};
use crate::models::RenditionInfo;
use std::path::Path;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info};

/// Encodes the whole ladder concurrently and writes the master manifest.
#[derive(Clone)]
pub struct RenditionTranscoder {
    engine: Arc<dyn MediaEngine>,
}

impl RenditionTranscoder {
    pub fn new(engine: Arc<dyn MediaEngine>) -> Self {
        Self { engine }
    }

    /// Run one encode per spec and wait for all of them.
    ///
    /// The first failure aborts the remaining encodes (their ffmpeg processes
    /// are killed) and is returned; nothing is written for a partial ladder.
    /// On success the master manifest is written to `work_dir` and the
    /// renditions are returned in `specs` order.
    pub async fn transcode_all(
        &self,
        input: &Path,
        work_dir: &Path,
        specs: &[RenditionSpec],
    ) -> PipelineResult<Vec<RenditionInfo>> {
        let mut tasks = JoinSet::new();

        for spec in specs.iter().cloned() {
            let engine = Arc::clone(&self.engine);
            let input = input.to_path_buf();
            let work_dir = work_dir.to_path_buf();
            tasks.spawn(async move {
                let result = engine.transcode(&input, &spec, &work_dir).await;
                (spec.label, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let failure = match joined {
                Ok((label, Ok(()))) => {
                    info!("Rendition {} finished", label);
                    continue;
                }
                Ok((_, Err(e))) => e,
                Err(join_error) => PipelineError::Transcode {
                    rendition: "unknown".to_string(),
                    message: format!("encode task died: {}", join_error),
                },
            };

            error!("Aborting {} remaining encodes: {}", tasks.len(), failure);
            tasks.abort_all();
            while tasks.join_next().await.is_some() {}
            return Err(failure);
        }

        let manifest_path = work_dir.join(MASTER_MANIFEST_NAME);
        tokio::fs::write(&manifest_path, generate_master_manifest(specs))
            .await
            .map_err(|e| PipelineError::io(&manifest_path, e))?;

        Ok(specs
            .iter()
            .map(|spec| RenditionInfo {
                resolution_label: spec.label.to_string(),
                bitrate_label: spec.bitrate_label(),
            })
            .collect())
    }
}
