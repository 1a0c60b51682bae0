use crate::client::ApiResource;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Account {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
}

impl Account {
    pub fn is_active(&self) -> bool {
        self.status == "active"
    }
}

impl ApiResource for Account {
    const PATH: &'static str = "accounts";
}
