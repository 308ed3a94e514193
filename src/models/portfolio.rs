//! Portfolio content models
//!
//! Profile, skills, projects, experience, education and certifications.
//! All of it is edited through the admin API or the seeder and only read by
//! the public index page.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Name shown when no profile has been entered yet
pub const FALLBACK_OWNER_NAME: (&str, &str) = ("Shekhar", "Dhakal");

/// The site owner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Profile {
    pub id: i64,
    pub name: String,
    pub role: String,
    pub bio: String,
    pub hero_title: String,
    pub hero_subtitle: String,
    pub avatar: Option<String>,
    pub current_company: String,
    pub current_role_location: String,
    pub about_bullet_1: String,
    pub about_bullet_2: String,
    pub about_bullet_3: String,
}

impl Profile {
    /// First word of the name and the remainder.
    pub fn split_name(&self) -> (String, String) {
        split_owner_name(Some(self.name.as_str()))
    }

    /// Non-empty about bullets in display order
    pub fn about_bullets(&self) -> Vec<&str> {
        [&self.about_bullet_1, &self.about_bullet_2, &self.about_bullet_3]
            .into_iter()
            .map(|b| b.trim())
            .filter(|b| !b.is_empty())
            .collect()
    }
}

/// Split an owner name into first and last parts, falling back to
/// [`FALLBACK_OWNER_NAME`] when there is no usable name.
pub fn split_owner_name(name: Option<&str>) -> (String, String) {
    let name = name.map(str::trim).filter(|n| !n.is_empty());
    match name {
        Some(name) => match name.split_once(char::is_whitespace) {
            Some((first, rest)) => (first.to_string(), rest.trim_start().to_string()),
            None => (name.to_string(), String::new()),
        },
        None => (
            FALLBACK_OWNER_NAME.0.to_string(),
            FALLBACK_OWNER_NAME.1.to_string(),
        ),
    }
}

/// Profile fields accepted on save
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileInput {
    pub name: String,
    pub role: String,
    pub bio: String,
    pub hero_title: String,
    pub hero_subtitle: String,
    pub avatar: Option<String>,
    pub current_company: String,
    pub current_role_location: String,
    pub about_bullet_1: String,
    pub about_bullet_2: String,
    pub about_bullet_3: String,
}

/// Skill grouping on the index page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SkillCategory {
    Frontend,
    Backend,
    #[serde(rename = "RPA")]
    Rpa,
    DevOps,
    Other,
}

impl SkillCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkillCategory::Frontend => "Frontend",
            SkillCategory::Backend => "Backend",
            SkillCategory::Rpa => "RPA",
            SkillCategory::DevOps => "DevOps",
            SkillCategory::Other => "Other",
        }
    }
}

impl fmt::Display for SkillCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SkillCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Frontend" => Ok(SkillCategory::Frontend),
            "Backend" => Ok(SkillCategory::Backend),
            "RPA" => Ok(SkillCategory::Rpa),
            "DevOps" => Ok(SkillCategory::DevOps),
            "Other" => Ok(SkillCategory::Other),
            _ => Err(format!("Unknown skill category: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Skill {
    pub id: i64,
    pub name: String,
    pub category: String,
    /// Font Awesome class; blank means "derive from the name"
    pub icon_class: String,
    pub sort_order: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillInput {
    pub name: String,
    pub category: SkillCategory,
    #[serde(default)]
    pub icon_class: String,
    #[serde(default)]
    pub sort_order: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub image: Option<String>,
    /// Comma separated technologies
    pub tech_stack: String,
    pub live_link: String,
    pub github_link: String,
    pub sort_order: i32,
    pub icon_name: String,
    pub accent_color: String,
}

impl Project {
    /// `tech_stack` split on commas, blanks dropped
    pub fn technologies(&self) -> Vec<&str> {
        self.tech_stack
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectInput {
    pub title: String,
    pub description: String,
    pub image: Option<String>,
    pub tech_stack: String,
    pub live_link: String,
    pub github_link: String,
    pub sort_order: i32,
    pub icon_name: String,
    pub accent_color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Experience {
    pub id: i64,
    pub company: String,
    pub role: String,
    pub duration: String,
    pub description: String,
    pub sort_order: i32,
    /// Highlighted entry on the timeline
    pub is_primary: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperienceInput {
    pub company: String,
    pub role: String,
    pub duration: String,
    pub description: String,
    pub sort_order: i32,
    pub is_primary: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Education {
    pub id: i64,
    pub duration: String,
    pub degree: String,
    pub institution: String,
    pub description: String,
    pub sort_order: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EducationInput {
    pub duration: String,
    pub degree: String,
    pub institution: String,
    pub description: String,
    pub sort_order: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Certification {
    pub id: i64,
    pub title: String,
    pub issuer: String,
    pub year: String,
    pub sort_order: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CertificationInput {
    pub title: String,
    pub issuer: String,
    pub year: String,
    pub sort_order: i32,
}

/// Skills of one category, in display order
#[derive(Debug, Clone, Serialize)]
pub struct SkillGroup {
    pub category: String,
    pub skills: Vec<Skill>,
}

/// Group skills by category, keeping categories in order of first appearance
pub fn group_skills(skills: &[Skill]) -> Vec<SkillGroup> {
    let mut groups: Vec<SkillGroup> = Vec::new();
    for skill in skills {
        match groups.iter_mut().find(|g| g.category == skill.category) {
            Some(group) => group.skills.push(skill.clone()),
            None => groups.push(SkillGroup {
                category: skill.category.clone(),
                skills: vec![skill.clone()],
            }),
        }
    }
    groups
}
