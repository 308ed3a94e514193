//! Portfolio content repository
//!
//! Profile, skills, projects, experience, education and certifications.

use anyhow::Result;
use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::db::{DynDatabasePool, InsertedId};
use crate::models::{
    Certification, CertificationInput, Education, EducationInput, Experience, ExperienceInput,
    Profile, ProfileInput, Project, ProjectInput, Skill, SkillInput,
};
use crate::on_pool;

/// The list-style portfolio collections, addressable by URL segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortfolioKind {
    Skills,
    Projects,
    Experiences,
    Education,
    Certifications,
}

impl PortfolioKind {
    pub const ALL: [PortfolioKind; 5] = [
        PortfolioKind::Skills,
        PortfolioKind::Projects,
        PortfolioKind::Experiences,
        PortfolioKind::Education,
        PortfolioKind::Certifications,
    ];

    pub fn table(&self) -> &'static str {
        match self {
            PortfolioKind::Skills => "skills",
            PortfolioKind::Projects => "projects",
            PortfolioKind::Experiences => "experiences",
            PortfolioKind::Education => "education",
            PortfolioKind::Certifications => "certifications",
        }
    }
}

impl fmt::Display for PortfolioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

impl FromStr for PortfolioKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PortfolioKind::ALL
            .into_iter()
            .find(|kind| kind.table() == s)
            .ok_or_else(|| format!("Unknown portfolio collection: {}", s))
    }
}

#[async_trait]
pub trait PortfolioRepository: Send + Sync {
    /// The site owner's profile, if one was entered
    async fn get_profile(&self) -> Result<Option<Profile>>;

    /// Update the existing profile or create the first one
    async fn save_profile(&self, input: &ProfileInput) -> Result<Profile>;

    async fn list_skills(&self) -> Result<Vec<Skill>>;
    async fn list_projects(&self) -> Result<Vec<Project>>;
    async fn list_experiences(&self) -> Result<Vec<Experience>>;
    async fn list_education(&self) -> Result<Vec<Education>>;
    async fn list_certifications(&self) -> Result<Vec<Certification>>;

    async fn create_skill(&self, input: &SkillInput) -> Result<Skill>;
    async fn create_project(&self, input: &ProjectInput) -> Result<Project>;
    async fn create_experience(&self, input: &ExperienceInput) -> Result<Experience>;
    async fn create_education(&self, input: &EducationInput) -> Result<Education>;
    async fn create_certification(&self, input: &CertificationInput) -> Result<Certification>;

    /// Delete one item; `false` when it did not exist
    async fn delete(&self, kind: PortfolioKind, id: i64) -> Result<bool>;

    /// Remove every list item and the profile. Site configuration is untouched.
    async fn clear(&self) -> Result<()>;
}

pub struct SqlxPortfolioRepository {
    pool: DynDatabasePool,
}

impl SqlxPortfolioRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PortfolioRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl PortfolioRepository for SqlxPortfolioRepository {
    async fn get_profile(&self) -> Result<Option<Profile>> {
        let profile = on_pool!(self.pool, |p| {
            sqlx::query_as::<_, Profile>("SELECT * FROM profiles ORDER BY id LIMIT 1")
                .fetch_optional(p)
                .await?
        });
        Ok(profile)
    }

    async fn save_profile(&self, input: &ProfileInput) -> Result<Profile> {
        let id = match self.get_profile().await? {
            Some(existing) => {
                on_pool!(self.pool, |p| {
                    sqlx::query(
                        r#"UPDATE profiles SET name = ?, role = ?, bio = ?, hero_title = ?,
                           hero_subtitle = ?, avatar = ?, current_company = ?,
                           current_role_location = ?, about_bullet_1 = ?, about_bullet_2 = ?,
                           about_bullet_3 = ? WHERE id = ?"#,
                    )
                    .bind(&input.name)
                    .bind(&input.role)
                    .bind(&input.bio)
                    .bind(&input.hero_title)
                    .bind(&input.hero_subtitle)
                    .bind(&input.avatar)
                    .bind(&input.current_company)
                    .bind(&input.current_role_location)
                    .bind(&input.about_bullet_1)
                    .bind(&input.about_bullet_2)
                    .bind(&input.about_bullet_3)
                    .bind(existing.id)
                    .execute(p)
                    .await?;
                });
                existing.id
            }
            None => on_pool!(self.pool, |p| {
                sqlx::query(
                    r#"INSERT INTO profiles (name, role, bio, hero_title, hero_subtitle, avatar,
                       current_company, current_role_location, about_bullet_1, about_bullet_2,
                       about_bullet_3) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
                )
                .bind(&input.name)
                .bind(&input.role)
                .bind(&input.bio)
                .bind(&input.hero_title)
                .bind(&input.hero_subtitle)
                .bind(&input.avatar)
                .bind(&input.current_company)
                .bind(&input.current_role_location)
                .bind(&input.about_bullet_1)
                .bind(&input.about_bullet_2)
                .bind(&input.about_bullet_3)
                .execute(p)
                .await?
                .inserted_id()
            }),
        };

        Ok(Profile {
            id,
            name: input.name.clone(),
            role: input.role.clone(),
            bio: input.bio.clone(),
            hero_title: input.hero_title.clone(),
            hero_subtitle: input.hero_subtitle.clone(),
            avatar: input.avatar.clone(),
            current_company: input.current_company.clone(),
            current_role_location: input.current_role_location.clone(),
            about_bullet_1: input.about_bullet_1.clone(),
            about_bullet_2: input.about_bullet_2.clone(),
            about_bullet_3: input.about_bullet_3.clone(),
        })
    }

    async fn list_skills(&self) -> Result<Vec<Skill>> {
        Ok(on_pool!(self.pool, |p| {
            sqlx::query_as::<_, Skill>("SELECT * FROM skills ORDER BY sort_order, name")
                .fetch_all(p)
                .await?
        }))
    }

    async fn list_projects(&self) -> Result<Vec<Project>> {
        Ok(on_pool!(self.pool, |p| {
            sqlx::query_as::<_, Project>("SELECT * FROM projects ORDER BY sort_order, id")
                .fetch_all(p)
                .await?
        }))
    }

    async fn list_experiences(&self) -> Result<Vec<Experience>> {
        Ok(on_pool!(self.pool, |p| {
            sqlx::query_as::<_, Experience>("SELECT * FROM experiences ORDER BY sort_order, id")
                .fetch_all(p)
                .await?
        }))
    }

    async fn list_education(&self) -> Result<Vec<Education>> {
        Ok(on_pool!(self.pool, |p| {
            sqlx::query_as::<_, Education>("SELECT * FROM education ORDER BY sort_order, id")
                .fetch_all(p)
                .await?
        }))
    }

    async fn list_certifications(&self) -> Result<Vec<Certification>> {
        Ok(on_pool!(self.pool, |p| {
            sqlx::query_as::<_, Certification>(
                "SELECT * FROM certifications ORDER BY sort_order, id",
            )
            .fetch_all(p)
            .await?
        }))
    }

    async fn create_skill(&self, input: &SkillInput) -> Result<Skill> {
        let category = input.category.as_str();
        let id = on_pool!(self.pool, |p| {
            sqlx::query(
                "INSERT INTO skills (name, category, icon_class, sort_order) VALUES (?, ?, ?, ?)",
            )
            .bind(&input.name)
            .bind(category)
            .bind(&input.icon_class)
            .bind(input.sort_order)
            .execute(p)
            .await?
            .inserted_id()
        });

        Ok(Skill {
            id,
            name: input.name.clone(),
            category: category.to_string(),
            icon_class: input.icon_class.clone(),
            sort_order: input.sort_order,
        })
    }

    async fn create_project(&self, input: &ProjectInput) -> Result<Project> {
        let id = on_pool!(self.pool, |p| {
            sqlx::query(
                r#"INSERT INTO projects (title, description, image, tech_stack, live_link,
                   github_link, sort_order, icon_name, accent_color)
                   VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            )
            .bind(&input.title)
            .bind(&input.description)
            .bind(&input.image)
            .bind(&input.tech_stack)
            .bind(&input.live_link)
            .bind(&input.github_link)
            .bind(input.sort_order)
            .bind(&input.icon_name)
            .bind(&input.accent_color)
            .execute(p)
            .await?
            .inserted_id()
        });

        Ok(Project {
            id,
            title: input.title.clone(),
            description: input.description.clone(),
            image: input.image.clone(),
            tech_stack: input.tech_stack.clone(),
            live_link: input.live_link.clone(),
            github_link: input.github_link.clone(),
            sort_order: input.sort_order,
            icon_name: input.icon_name.clone(),
            accent_color: input.accent_color.clone(),
        })
    }

    async fn create_experience(&self, input: &ExperienceInput) -> Result<Experience> {
        let id = on_pool!(self.pool, |p| {
            sqlx::query(
                r#"INSERT INTO experiences (company, role, duration, description, sort_order, is_primary)
                   VALUES (?, ?, ?, ?, ?, ?)"#,
            )
            .bind(&input.company)
            .bind(&input.role)
            .bind(&input.duration)
            .bind(&input.description)
            .bind(input.sort_order)
            .bind(input.is_primary)
            .execute(p)
            .await?
            .inserted_id()
        });

        Ok(Experience {
            id,
            company: input.company.clone(),
            role: input.role.clone(),
            duration: input.duration.clone(),
            description: input.description.clone(),
            sort_order: input.sort_order,
            is_primary: input.is_primary,
        })
    }

    async fn create_education(&self, input: &EducationInput) -> Result<Education> {
        let id = on_pool!(self.pool, |p| {
            sqlx::query(
                r#"INSERT INTO education (duration, degree, institution, description, sort_order)
                   VALUES (?, ?, ?, ?, ?)"#,
            )
            .bind(&input.duration)
            .bind(&input.degree)
            .bind(&input.institution)
            .bind(&input.description)
            .bind(input.sort_order)
            .execute(p)
            .await?
            .inserted_id()
        });

        Ok(Education {
            id,
            duration: input.duration.clone(),
            degree: input.degree.clone(),
            institution: input.institution.clone(),
            description: input.description.clone(),
            sort_order: input.sort_order,
        })
    }

    async fn create_certification(&self, input: &CertificationInput) -> Result<Certification> {
        let id = on_pool!(self.pool, |p| {
            sqlx::query(
                "INSERT INTO certifications (title, issuer, year, sort_order) VALUES (?, ?, ?, ?)",
            )
            .bind(&input.title)
            .bind(&input.issuer)
            .bind(&input.year)
            .bind(input.sort_order)
            .execute(p)
            .await?
            .inserted_id()
        });

        Ok(Certification {
            id,
            title: input.title.clone(),
            issuer: input.issuer.clone(),
            year: input.year.clone(),
            sort_order: input.sort_order,
        })
    }

    async fn delete(&self, kind: PortfolioKind, id: i64) -> Result<bool> {
        let sql = format!("DELETE FROM {} WHERE id = ?", kind.table());
        let affected = on_pool!(self.pool, |p| {
            sqlx::query(&sql).bind(id).execute(p).await?.rows_affected()
        });
        Ok(affected > 0)
    }

    async fn clear(&self) -> Result<()> {
        for kind in PortfolioKind::ALL {
            self.pool
                .execute(&format!("DELETE FROM {}", kind.table()))
                .await?;
        }
        self.pool.execute("DELETE FROM profiles").await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use crate::models::SkillCategory;

    async fn setup() -> SqlxPortfolioRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool).await.expect("Failed to run migrations");
        SqlxPortfolioRepository::new(pool)
    }

    fn skill(name: &str, category: SkillCategory, sort_order: i32) -> SkillInput {
        SkillInput {
            name: name.to_string(),
            category,
            icon_class: String::new(),
            sort_order,
        }
    }

    #[tokio::test]
    async fn test_save_profile_upserts_single_row() {
        let repo = setup().await;
        assert!(repo.get_profile().await.unwrap().is_none());

        let mut input = ProfileInput {
            name: "Ada Lovelace".into(),
            role: "Engineer".into(),
            bio: "Notes on engines".into(),
            ..Default::default()
        };
        let first = repo.save_profile(&input).await.unwrap();

        input.role = "Analyst".into();
        let second = repo.save_profile(&input).await.unwrap();

        assert_eq!(first.id, second.id);
        let stored = repo.get_profile().await.unwrap().unwrap();
        assert_eq!(stored.role, "Analyst");
    }

    #[tokio::test]
    async fn test_skills_ordered_by_order_then_name() {
        let repo = setup().await;
        repo.create_skill(&skill("Selenium", SkillCategory::Rpa, 2)).await.unwrap();
        repo.create_skill(&skill("Python", SkillCategory::Backend, 1)).await.unwrap();
        repo.create_skill(&skill("Django", SkillCategory::Backend, 1)).await.unwrap();

        let names: Vec<String> = repo
            .list_skills()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["Django", "Python", "Selenium"]);
    }

    #[tokio::test]
    async fn test_delete_and_clear() {
        let repo = setup().await;
        let project = repo
            .create_project(&ProjectInput {
                title: "Bot fleet".into(),
                description: "RPA at scale".into(),
                tech_stack: "Python, Robocorp".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        repo.create_certification(&CertificationInput {
            title: "CKA".into(),
            issuer: "CNCF".into(),
            ..Default::default()
        })
        .await
        .unwrap();

        assert!(repo.delete(PortfolioKind::Projects, project.id).await.unwrap());
        assert!(!repo.delete(PortfolioKind::Projects, project.id).await.unwrap());

        repo.clear().await.unwrap();
        assert!(repo.list_certifications().await.unwrap().is_empty());
    }

    #[test]
    fn test_kind_from_segment() {
        assert_eq!("education".parse::<PortfolioKind>().unwrap(), PortfolioKind::Education);
        assert!("profiles".parse::<PortfolioKind>().is_err());
    }
}
