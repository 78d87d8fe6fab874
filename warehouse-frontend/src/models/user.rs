use serde::{Deserialize, Serialize};

use super::de::string_or_number;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Partner,
    Admin,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct UserProfile {
    #[serde(alias = "_id", deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default, alias = "companyName")]
    pub company_name: Option<String>,
}

impl UserProfile {
    pub fn display_name(&self) -> String {
        if !self.name.trim().is_empty() {
            return self.name.trim().to_string();
        }
        self.email.split('@').next().unwrap_or("User").to_string()
    }

    pub fn initials(&self) -> String {
        let initials: String = self
            .display_name()
            .split_whitespace()
            .filter_map(|word| word.chars().next())
            .take(2)
            .collect::<String>()
            .to_uppercase();
        if initials.is_empty() {
            "U".to_string()
        } else {
            initials
        }
    }
}

/// `PUT /api/users/:id` body. Only the fields present are changed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "companyName")]
    pub company_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(name: &str, email: &str) -> UserProfile {
        UserProfile {
            id: "u1".to_string(),
            name: name.to_string(),
            email: email.to_string(),
            role: Role::User,
            phone: None,
            company_name: None,
        }
    }

    #[test]
    fn initials_use_name_words() {
        assert_eq!(profile("priya nair", "p@x.in").initials(), "PN");
        assert_eq!(profile("", "kiran@x.in").initials(), "K");
    }

    #[test]
    fn role_defaults_to_user() {
        let user: UserProfile =
            serde_json::from_value(serde_json::json!({ "id": 5, "email": "a@b.in" })).unwrap();
        assert_eq!(user.role, Role::User);
        assert_eq!(user.id, "5");
    }
}
