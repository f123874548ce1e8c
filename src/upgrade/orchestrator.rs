use anyhow::{Context, Result};
use colored::Colorize;

use super::{UpgradeOutcome, UpgradeReport, UpgradeState, VersionCheck};
use crate::cli::prompt::Prompt;
use crate::compose::ComposeFile;
use crate::config::UpdaterConfig;
use crate::core::UpdaterError;
use crate::engine::ContainerEngine;
use crate::logwatch::{LogWatcher, WatchOutcome};
use crate::registry::TagSource;
use crate::utils::spinner_with_message;
use crate::version::VersionComparator;

/// Drives one check-and-upgrade run against a compose deployment.
///
/// The engine, tag source and prompt are injected so the sequence can run
/// against fakes.
///
/// ```rust,no_run
/// use youtrack_updater::cli::prompt::StdinPrompt;
/// use youtrack_updater::config::UpdaterConfig;
/// use youtrack_updater::engine::DockerEngine;
/// use youtrack_updater::registry::RegistryClient;
/// use youtrack_updater::upgrade::Upgrader;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = UpdaterConfig::default();
/// let engine = DockerEngine::new(&config.engine, config.compose_path()?);
/// let registry = RegistryClient::new(&config)?;
/// let mut upgrader = Upgrader::new(&config, engine, registry, StdinPrompt)?;
/// let outcome = upgrader.run().await?;
/// # Ok(())
/// # }
/// ```
pub struct Upgrader<E, R, P> {
    compose: ComposeFile,
    engine: E,
    registry: R,
    prompt: P,
    watcher: LogWatcher,
    engine_program: String,
    state: UpgradeState,
}

impl<E, R, P> Upgrader<E, R, P>
where
    E: ContainerEngine,
    R: TagSource,
    P: Prompt,
{
    /// Build an upgrader for the deployment described by `config`.
    ///
    /// # Errors
    ///
    /// Fails if the compose path cannot be expanded or the image name does
    /// not form a valid pattern.
    pub fn new(config: &UpdaterConfig, engine: E, registry: R, prompt: P) -> Result<Self> {
        let compose = ComposeFile::new(config.compose_path()?, &config.image)?;
        Ok(Self {
            compose,
            engine,
            registry,
            prompt,
            watcher: LogWatcher::new(config.setup_marker.clone(), config.log_timeout()),
            engine_program: config.engine.clone(),
            state: UpgradeState::Idle,
        })
    }

    /// Current state of the run.
    #[must_use]
    pub const fn state(&self) -> UpgradeState {
        self.state
    }

    #[must_use]
    pub const fn engine(&self) -> &E {
        &self.engine
    }

    #[must_use]
    pub const fn prompt(&self) -> &P {
        &self.prompt
    }

    fn transition(&mut self, next: UpgradeState) {
        tracing::debug!("Upgrade state: {} -> {}", self.state, next);
        self.state = next;
    }

    fn reference(&self, tag: &str) -> String {
        format!("{}:{tag}", self.compose.image())
    }

    /// Compare the deployed tag with the newest one on the registry.
    ///
    /// # Errors
    ///
    /// Fails if the compose file cannot be read, the registry cannot be
    /// queried, or the deployed tag is not a version.
    pub async fn check(&mut self) -> Result<VersionCheck> {
        let current = self.compose.read_tag()?;
        println!("Current version: {}", current.bold());

        let spinner = spinner_with_message(format!(
            "Checking the registry for new {} tags...",
            self.compose.image()
        ));
        let latest = self.registry.latest_tag().await;
        spinner.finish_and_clear();
        let latest = latest?;
        println!("Latest version:  {}", latest.tag.bold());

        let update_available = VersionComparator::is_newer(&current, &latest.tag)?;
        self.transition(UpgradeState::CheckedVersions);

        Ok(VersionCheck {
            current,
            latest,
            update_available,
        })
    }

    /// Check, ask, and upgrade if there is something newer.
    ///
    /// # Errors
    ///
    /// Any fatal step error; the state is left at [`UpgradeState::Failed`].
    pub async fn run(&mut self) -> Result<UpgradeOutcome> {
        let result = self.run_inner().await;
        if result.is_err() {
            self.transition(UpgradeState::Failed);
        }
        result
    }

    async fn run_inner(&mut self) -> Result<UpgradeOutcome> {
        let check = self.check().await?;

        if !check.update_available {
            println!("{}", "YouTrack is up to date".green());
            self.transition(UpgradeState::Done);
            return Ok(UpgradeOutcome::UpToDate {
                current: check.current,
            });
        }

        let question = format!(
            "Upgrade {} from {} to {}?",
            self.compose.image(),
            check.current,
            check.latest.tag
        );
        if !self.prompt.confirm(&question).await? {
            println!("{}", "Upgrade cancelled".yellow());
            self.transition(UpgradeState::Aborted);
            return Ok(UpgradeOutcome::Declined {
                current: check.current,
                latest: check.latest.tag,
            });
        }
        self.transition(UpgradeState::Confirmed);

        let report = self.upgrade(&check.current, &check.latest.tag).await?;
        Ok(UpgradeOutcome::Upgraded(report))
    }

    async fn upgrade(&mut self, current: &str, latest: &str) -> Result<UpgradeReport> {
        self.engine.ensure_available()?;

        let new_reference = self.reference(latest);
        let old_reference = self.reference(current);

        self.transition(UpgradeState::Pulling);
        println!("{}", format!("Pulling {new_reference}...").cyan());
        let code = self.engine.pull(&new_reference).await?;
        if code != 0 {
            return Err(UpdaterError::PullFailed {
                reference: new_reference,
                code,
            }
            .into());
        }

        self.transition(UpgradeState::Stopping);
        println!("{}", "Stopping the current deployment...".cyan());
        let code = self.engine.compose_down().await?;
        if code != 0 {
            return Err(UpdaterError::StopFailed {
                code,
            }
            .into());
        }

        self.transition(UpgradeState::Rewriting);
        let references_rewritten = self.compose.rewrite_tag(latest).with_context(|| {
            format!("Failed to update {} to {latest}", self.compose.path().display())
        })?;
        tracing::info!(
            "Updated {} to {new_reference} ({references_rewritten} reference(s))",
            self.compose.path().display()
        );

        self.transition(UpgradeState::Starting);
        println!("{}", "Starting the new deployment...".cyan());
        let code = self.engine.compose_up_detached().await?;
        if code != 0 {
            return Err(UpdaterError::StartFailed {
                code,
                previous_tag: current.to_string(),
                compose_file: self.compose.path().display().to_string(),
            }
            .into());
        }

        self.transition(UpgradeState::WatchingLogs);
        let setup = self.watch_logs().await;

        self.transition(UpgradeState::CleaningUp);
        let old_image_removed = self.remove_old_image(&old_reference).await;

        self.transition(UpgradeState::Done);
        println!("{}", format!("Upgraded {current} → {latest}").green().bold());

        Ok(UpgradeReport {
            previous_tag: current.to_string(),
            new_tag: latest.to_string(),
            references_rewritten,
            setup,
            old_image_removed,
        })
    }

    async fn watch_logs(&self) -> Option<WatchOutcome> {
        println!(
            "{}",
            format!("Waiting up to {}s for the setup link...", self.watcher.timeout().as_secs())
                .cyan()
        );

        let mut stream = match self.engine.follow_logs().await {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!("Could not follow container logs: {e:#}");
                self.print_logs_hint();
                return None;
            }
        };

        let outcome = self.watcher.watch(stream.reader()).await;
        stream.stop().await;

        match &outcome {
            WatchOutcome::SetupUrl(url) => {
                println!("{} {}", "Finish the setup at:".green().bold(), url.bold());
            }
            WatchOutcome::MarkerWithoutUrl => {
                tracing::warn!("Setup line found but it carried no link");
                self.print_logs_hint();
            }
            WatchOutcome::TimedOut => {
                tracing::warn!(
                    "No setup link within {}s",
                    self.watcher.timeout().as_secs()
                );
                self.print_logs_hint();
            }
            WatchOutcome::StreamClosed => {
                tracing::debug!("Log stream ended without a setup link");
            }
        }

        Some(outcome)
    }

    fn print_logs_hint(&self) {
        println!(
            "{} {}",
            "No setup link captured; inspect the logs with".yellow(),
            format!("{} compose -f {} logs -f", self.engine_program, self.compose.path().display())
                .cyan()
        );
    }

    async fn remove_old_image(&self, reference: &str) -> bool {
        match self.engine.remove_image(reference).await {
            Ok(0) => {
                tracing::info!("Removed old image {reference}");
                true
            }
            Ok(code) => {
                tracing::warn!("Failed to remove old image {reference} (exit code {code})");
                println!("{}", format!("Could not remove old image {reference}").yellow());
                false
            }
            Err(e) => {
                tracing::warn!("Failed to remove old image {reference}: {e:#}");
                println!("{}", format!("Could not remove old image {reference}").yellow());
                false
            }
        }
    }
}
