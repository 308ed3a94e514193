//! Portfolio content service
//!
//! Reads everything the index page shows and applies admin edits and seed
//! imports.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::db::repositories::{PortfolioKind, PortfolioRepository};
use crate::models::{
    group_skills, split_owner_name, Certification, CertificationInput, Education, EducationInput,
    Experience, ExperienceInput, Profile, ProfileInput, Project, ProjectInput, Skill, SkillGroup,
    SkillInput,
};

#[derive(Debug, thiserror::Error)]
pub enum PortfolioServiceError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Everything the index page shows about the site owner
#[derive(Debug, Clone, Serialize)]
pub struct PortfolioOverview {
    pub profile: Option<Profile>,
    pub first_name: String,
    pub last_name: String,
    pub skills: Vec<Skill>,
    pub skill_groups: Vec<SkillGroup>,
    pub projects: Vec<Project>,
    pub experiences: Vec<Experience>,
    pub education: Vec<Education>,
    pub certifications: Vec<Certification>,
}

/// Portfolio content as written in a seed file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PortfolioSeed {
    pub profile: Option<ProfileInput>,
    pub skills: Vec<SkillInput>,
    pub projects: Vec<ProjectInput>,
    pub experiences: Vec<ExperienceInput>,
    pub education: Vec<EducationInput>,
    pub certifications: Vec<CertificationInput>,
}

/// Rows written by [`PortfolioService::import`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub profile: bool,
    pub skills: usize,
    pub projects: usize,
    pub experiences: usize,
    pub education: usize,
    pub certifications: usize,
}

pub struct PortfolioService {
    repo: Arc<dyn PortfolioRepository>,
}

impl PortfolioService {
    pub fn new(repo: Arc<dyn PortfolioRepository>) -> Self {
        Self { repo }
    }

    pub async fn overview(&self) -> Result<PortfolioOverview, PortfolioServiceError> {
        let profile = self.repo.get_profile().await?;
        let (first_name, last_name) = split_owner_name(profile.as_ref().map(|p| p.name.as_str()));
        let skills = self.repo.list_skills().await?;

        Ok(PortfolioOverview {
            first_name,
            last_name,
            skill_groups: group_skills(&skills),
            skills,
            projects: self.repo.list_projects().await?,
            experiences: self.repo.list_experiences().await?,
            education: self.repo.list_education().await?,
            certifications: self.repo.list_certifications().await?,
            profile,
        })
    }

    pub async fn profile(&self) -> Result<Profile, PortfolioServiceError> {
        self.repo
            .get_profile()
            .await?
            .ok_or_else(|| PortfolioServiceError::NotFound("Profile".to_string()))
    }

    pub async fn save_profile(&self, input: ProfileInput) -> Result<Profile, PortfolioServiceError> {
        require("name", &input.name)?;
        Ok(self.repo.save_profile(&input).await?)
    }

    pub async fn add_skill(&self, input: SkillInput) -> Result<Skill, PortfolioServiceError> {
        require("name", &input.name)?;
        Ok(self.repo.create_skill(&input).await?)
    }

    pub async fn add_project(&self, input: ProjectInput) -> Result<Project, PortfolioServiceError> {
        require("title", &input.title)?;
        Ok(self.repo.create_project(&input).await?)
    }

    pub async fn add_experience(&self, input: ExperienceInput) -> Result<Experience, PortfolioServiceError> {
        require("company", &input.company)?;
        require("role", &input.role)?;
        Ok(self.repo.create_experience(&input).await?)
    }

    pub async fn add_education(&self, input: EducationInput) -> Result<Education, PortfolioServiceError> {
        require("degree", &input.degree)?;
        require("institution", &input.institution)?;
        Ok(self.repo.create_education(&input).await?)
    }

    pub async fn add_certification(
        &self,
        input: CertificationInput,
    ) -> Result<Certification, PortfolioServiceError> {
        require("title", &input.title)?;
        Ok(self.repo.create_certification(&input).await?)
    }

    pub async fn delete(&self, kind: PortfolioKind, id: i64) -> Result<(), PortfolioServiceError> {
        if !self.repo.delete(kind, id).await? {
            return Err(PortfolioServiceError::NotFound(format!("{} #{}", kind, id)));
        }
        Ok(())
    }

    /// Remove every portfolio item and the profile
    pub async fn clear(&self) -> Result<(), PortfolioServiceError> {
        self.repo.clear().await?;
        tracing::info!("Portfolio content cleared");
        Ok(())
    }

    /// Write the content of a seed file, stopping at the first invalid entry
    pub async fn import(&self, seed: PortfolioSeed) -> Result<ImportSummary, PortfolioServiceError> {
        let mut summary = ImportSummary::default();

        if let Some(profile) = seed.profile {
            self.save_profile(profile).await?;
            summary.profile = true;
        }
        for skill in seed.skills {
            self.add_skill(skill).await?;
            summary.skills += 1;
        }
        for project in seed.projects {
            self.add_project(project).await?;
            summary.projects += 1;
        }
        for experience in seed.experiences {
            self.add_experience(experience).await?;
            summary.experiences += 1;
        }
        for education in seed.education {
            self.add_education(education).await?;
            summary.education += 1;
        }
        for certification in seed.certifications {
            self.add_certification(certification).await?;
            summary.certifications += 1;
        }

        tracing::info!(?summary, "Portfolio content imported");
        Ok(summary)
    }
}

fn require(field: &str, value: &str) -> Result<(), PortfolioServiceError> {
    if value.trim().is_empty() {
        return Err(PortfolioServiceError::ValidationError(format!("{} cannot be empty", field)));
    }
    Ok(())
}
