//! Command-line arguments.

use clap::{Args, Parser, Subcommand, ValueEnum};
use jobhound_core::{ExperienceLevel, FilterSpec, JobType, ScrapeRequest, WorkArrangement};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    name = "jobhound",
    about = "Search a job board, extract listings from the detail panel and score them",
    version
)]
pub(crate) struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true, env = "JOBHOUND_CONFIG")]
    pub(crate) config: Option<PathBuf>,

    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Run one search session and print the result as JSON
    Scrape(ScrapeArgs),
    /// Validate and print the effective configuration
    Config,
}

#[derive(Args, Debug)]
pub(crate) struct ScrapeArgs {
    /// Search keywords
    #[arg(long)]
    pub(crate) keywords: String,
    /// Search location
    #[arg(long, default_value = "")]
    pub(crate) location: String,
    /// Stop after this many unique listings (defaults to `scraping.max_jobs`)
    #[arg(long)]
    pub(crate) max_jobs: Option<usize>,
    /// Only listings posted within this many days
    #[arg(long, value_name = "DAYS")]
    pub(crate) date_posted: Option<u32>,
    #[arg(long, value_enum)]
    pub(crate) work_arrangement: Option<Arrangement>,
    #[arg(long, value_enum)]
    pub(crate) experience_level: Option<Level>,
    #[arg(long, value_enum)]
    pub(crate) job_type: Option<Employment>,
    /// Give up and return partial results after this many seconds
    #[arg(long, value_name = "SECS")]
    pub(crate) deadline: Option<u64>,
    /// Candidate profile text file used for scoring
    #[arg(long, value_name = "FILE")]
    pub(crate) profile: Option<PathBuf>,
    /// Resume text file used for scoring
    #[arg(long, value_name = "FILE")]
    pub(crate) resume: Option<PathBuf>,
    /// Show the browser window
    #[arg(long)]
    pub(crate) headed: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Arrangement {
    Remote,
    Hybrid,
    OnSite,
}

impl From<Arrangement> for WorkArrangement {
    fn from(value: Arrangement) -> Self {
        match value {
            Arrangement::Remote => Self::Remote,
            Arrangement::Hybrid => Self::Hybrid,
            Arrangement::OnSite => Self::OnSite,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Level {
    Internship,
    EntryLevel,
    Associate,
    MidSenior,
    Director,
    Executive,
}

impl From<Level> for ExperienceLevel {
    fn from(value: Level) -> Self {
        match value {
            Level::Internship => Self::Internship,
            Level::EntryLevel => Self::EntryLevel,
            Level::Associate => Self::Associate,
            Level::MidSenior => Self::MidSenior,
            Level::Director => Self::Director,
            Level::Executive => Self::Executive,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Employment {
    FullTime,
    PartTime,
    Contract,
    Temporary,
    Internship,
    Volunteer,
}

impl From<Employment> for JobType {
    fn from(value: Employment) -> Self {
        match value {
            Employment::FullTime => Self::FullTime,
            Employment::PartTime => Self::PartTime,
            Employment::Contract => Self::Contract,
            Employment::Temporary => Self::Temporary,
            Employment::Internship => Self::Internship,
            Employment::Volunteer => Self::Volunteer,
        }
    }
}

impl ScrapeArgs {
    /// Build the request; `default_max_jobs` applies when `--max-jobs` is absent.
    pub(crate) fn to_request(&self, default_max_jobs: usize) -> ScrapeRequest {
        let mut request = ScrapeRequest::new(self.keywords.clone(), self.location.clone())
            .with_max_jobs(self.max_jobs.unwrap_or(default_max_jobs));

        if let Some(days) = self.date_posted {
            request = request.with_filter(FilterSpec::date_posted(days));
        }
        if let Some(arrangement) = self.work_arrangement {
            request = request.with_filter(FilterSpec::work_arrangement(arrangement.into()));
        }
        if let Some(level) = self.experience_level {
            request = request.with_filter(FilterSpec::experience_level(level.into()));
        }
        if let Some(job_type) = self.job_type {
            request = request.with_filter(FilterSpec::job_type(job_type.into()));
        }
        if let Some(secs) = self.deadline {
            request = request.with_deadline(Duration::from_secs(secs));
        }
        request
    }
}
