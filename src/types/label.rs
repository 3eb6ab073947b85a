use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Label {
    pub id: String,
    pub name: String,
    pub color: String,
}

/// Label as returned by the detail query, which also asks for a description.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct DetailLabel {
    pub id: String,
    pub name: String,
    pub color: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl From<&Label> for DetailLabel {
    fn from(label: &Label) -> Self {
        Self {
            id: label.id.clone(),
            name: label.name.clone(),
            color: label.color.clone(),
            description: None,
        }
    }
}
