//! Data models
//!
//! Structures shared by the repositories, services and handlers:
//! - Database entities (SiteConfiguration, Profile, Skill, Project, Experience,
//!   Education, Certification, ContactMessage, NewsletterSubscriber, BlogPost,
//!   Category, Tag, Comment)
//! - Input types accepted by the admin API and the seeder
//! - Listing and pagination helpers

mod blog;
mod comment;
mod contact;
mod portfolio;
mod site_config;

pub use blog::{
    post_path, BlogPost, Category, CreatePostInput, ListParams, PagedResult, PostFilter, Tag,
    TaxonomyInput, UpdatePostInput, POSTS_PER_PAGE,
};
pub use comment::{Comment, NewComment};
pub use contact::{ContactMessage, NewContactMessage, NewsletterSubscriber};
pub use portfolio::{
    group_skills, split_owner_name, Certification, CertificationInput, Education, EducationInput,
    Experience, ExperienceInput, Profile, ProfileInput, Project, ProjectInput, Skill,
    SkillCategory, SkillGroup, SkillInput, FALLBACK_OWNER_NAME,
};
pub use site_config::{SiteConfiguration, SITE_CONFIG_ID};
