#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub location: Option<String>,
    pub description: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Default)]
pub struct NewProject {
    pub name: String,
    pub location: Option<String>,
    pub description: Option<String>,
}

/// A physical installation (an inverter array, say) belonging to a project.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct System {
    pub id: i64,
    pub project_id: i64,
    pub name: String,
    pub capacity_kw: Option<f64>,
    pub inverter_type: Option<String>,
    pub notes: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Default)]
pub struct NewSystem {
    pub project_id: i64,
    pub name: String,
    pub capacity_kw: Option<f64>,
    pub inverter_type: Option<String>,
    pub notes: Option<String>,
}
