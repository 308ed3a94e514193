//! Site configuration model
//!
//! One record holds every site-wide setting: name, SEO defaults, section
//! titles, contact details and social links. The row always lives under
//! [`SITE_CONFIG_ID`]; it is created with [`SiteConfiguration::default`]
//! values the first time it is read.

use serde::{Deserialize, Serialize};

/// Identity key of the singleton row
pub const SITE_CONFIG_ID: i64 = 1;

/// Site-wide settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(default)]
pub struct SiteConfiguration {
    pub id: i64,
    pub site_name: String,

    // SEO defaults
    pub meta_title: String,
    pub meta_description: String,
    pub meta_keywords: String,

    // Section titles on the index page
    pub about_section_title: String,
    pub skills_section_title: String,
    pub experience_section_title: String,
    pub portfolio_section_title: String,
    pub contact_section_title: String,

    // Contact details
    pub email: String,
    pub phone: String,
    pub address: String,
    pub location: String,

    // Social links, blank when unused
    pub github_link: String,
    pub linkedin_link: String,
    pub twitter_link: String,
    pub facebook_link: String,
}

impl Default for SiteConfiguration {
    fn default() -> Self {
        Self {
            id: SITE_CONFIG_ID,
            site_name: "Shekhar's Portfolio".to_string(),
            meta_title: "Shekhar Dhakal | Backend & RPA Architect".to_string(),
            meta_description: "Portfolio of Shekhar Dhakal, a Backend Engineer specialized in \
                high-performance Python ecosystems and Robotic Process Automation (RPA)."
                .to_string(),
            meta_keywords: "backend, rpa, python, django, devops".to_string(),
            about_section_title: "01. Background".to_string(),
            skills_section_title: "02. Expertise".to_string(),
            experience_section_title: "03. Career Path".to_string(),
            portfolio_section_title: "04. Selected Projects".to_string(),
            contact_section_title: "05. Contact".to_string(),
            email: "shekhardhakal2015@gmail.com".to_string(),
            phone: "+977 9840177381".to_string(),
            address: String::new(),
            location: String::new(),
            github_link: String::new(),
            linkedin_link: String::new(),
            twitter_link: String::new(),
            facebook_link: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_targets_singleton_identity() {
        let config = SiteConfiguration::default();
        assert_eq!(config.id, SITE_CONFIG_ID);
        assert_eq!(config.site_name, "Shekhar's Portfolio");
        assert_eq!(config.contact_section_title, "05. Contact");
        assert!(config.github_link.is_empty());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: SiteConfiguration =
            serde_json::from_str(r#"{"site_name": "Ada's Corner"}"#).unwrap();
        assert_eq!(config.site_name, "Ada's Corner");
        assert_eq!(config.meta_keywords, "backend, rpa, python, django, devops");
    }
}
