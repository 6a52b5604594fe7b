use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use std::path::PathBuf;

use crate::auth::Token;
use crate::config::{Config, OutputFormat};
use crate::output;
use crate::providers::GitLabProvider;
use crate::reference::{
    BuildResult, FilteredLog, PolicyKind, ReferenceBuildRecord, ReferenceResolver,
};
use crate::registry::Registry;

#[derive(Parser)]
#[command(name = "refbuild")]
#[command(author, version, about = "Reference Build Resolver", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to ./refbuild.{toml,json,yaml,yml})
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Write the result as JSON to this file
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    #[arg(short, long, global = true, value_enum)]
    format: Option<OutputFormat>,

    #[arg(long, global = true, default_value_t = false)]
    pretty: bool,

    /// Branch to compare against, overrides merge request detection
    #[arg(short, long, global = true)]
    target_branch: Option<String>,

    #[arg(long, global = true, value_enum)]
    policy: Option<PolicyKind>,

    /// Worst acceptable result for the required-result policy
    #[arg(long, global = true, value_enum)]
    required_result: Option<BuildResult>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the reference build from a registry snapshot file
    Resolve {
        #[arg(short, long)]
        snapshot: PathBuf,

        /// Full job name, `<project>/<branch>`
        #[arg(short, long)]
        job: String,

        /// Build number (defaults to the job's latest build)
        #[arg(short, long)]
        build: Option<u64>,
    },
    /// Resolve the reference build of a branch of a GitLab project
    Gitlab {
        #[arg(long, env = "GITLAB_TOKEN")]
        token: Option<String>,

        #[arg(short, long)]
        url: Option<String>,

        #[arg(short = 'P', long)]
        project: Option<String>,

        #[arg(short, long)]
        branch: String,

        #[arg(short, long)]
        limit: Option<usize>,

        /// Also store the imported registry snapshot in this file
        #[arg(long)]
        save_snapshot: Option<PathBuf>,
    },
}

impl Cli {
    async fn import_gitlab(
        config: &Config,
        token: Option<&str>,
        url: Option<&str>,
        project: Option<&str>,
        limit: Option<usize>,
        save_snapshot: Option<&PathBuf>,
    ) -> Result<(Registry, String)> {
        let project = project
            .or(config.gitlab.project_path.as_deref())
            .context("No GitLab project given, use --project or set gitlab.project-path")?;
        let url = url.unwrap_or(&config.gitlab.base_url);
        let token = token
            .or(config.gitlab.token.as_deref())
            .map(Token::from);
        let limit = limit.unwrap_or(config.gitlab.limit);

        info!("Importing GitLab project: {project}");

        let provider = GitLabProvider::new(url, project.to_owned(), token)?;
        let snapshot = provider.fetch_snapshot(limit).await?;

        if let Some(path) = save_snapshot {
            snapshot.save(path)?;
            info!("Snapshot written to: {}", path.display());
        }

        Ok((Registry::new(snapshot), project.to_owned()))
    }

    fn create_resolver(&self, config: &Config, registry: &Registry) -> ReferenceResolver {
        let target_branch = self
            .target_branch
            .clone()
            .unwrap_or_else(|| config.resolver.target_branch.clone());
        let policy = self.policy.unwrap_or(config.resolver.policy);
        let required = self
            .required_result
            .unwrap_or(config.resolver.required_result);

        ReferenceResolver::new(Box::new(registry.scm_facade()), policy.create(required))
            .with_target_branch(target_branch)
    }

    fn resolve(
        &self,
        config: &Config,
        registry: &Registry,
        job: &str,
        number: Option<u64>,
    ) -> Result<ReferenceBuildRecord> {
        let build = registry
            .build(job, number)
            .with_context(|| format!("Failed to find the build to resolve for '{job}'"))?;
        info!("Resolving reference build for: {}", build.externalizable_id());

        let resolver = self.create_resolver(config, registry);
        let mut log = FilteredLog::new("Reference");
        let reference = resolver.find_reference_build(&build, &mut log);

        Ok(reference.to_record(&log))
    }

    fn write_output(&self, config: &Config, record: &ReferenceBuildRecord) -> Result<()> {
        let pretty = self.pretty || config.output.pretty;

        if let Some(output_path) = &self.output {
            std::fs::write(output_path, output::to_json(record, pretty)?)
                .with_context(|| format!("Failed to write {}", output_path.display()))?;
            info!("Result written to: {}", output_path.display());
            return Ok(());
        }

        match self.format.unwrap_or(config.output.format) {
            OutputFormat::Summary => output::print_summary(record),
            OutputFormat::Json => println!("{}", output::to_json(record, pretty)?),
        }

        Ok(())
    }

    pub async fn execute(&self) -> Result<()> {
        let config = Config::load(self.config.as_deref())?;

        let record = match &self.command {
            Commands::Resolve {
                snapshot,
                job,
                build,
            } => {
                let registry = Registry::load(snapshot)?;
                self.resolve(&config, &registry, job, *build)?
            }
            Commands::Gitlab {
                token,
                url,
                project,
                branch,
                limit,
                save_snapshot,
            } => {
                let (registry, project) = Self::import_gitlab(
                    &config,
                    token.as_deref(),
                    url.as_deref(),
                    project.as_deref(),
                    *limit,
                    save_snapshot.as_ref(),
                )
                .await?;
                self.resolve(&config, &registry, &format!("{project}/{branch}"), None)?
            }
        };

        self.write_output(&config, &record)
    }
}
