use sea_orm::entity::prelude::*;

/// One consumption attempt against an access code. Rows are append-only.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "usage_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub access_code_id: Uuid,
    pub success: bool,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub requester_info: Option<String>,
    pub artifact_ref: Option<String>,
    /// Kind of artifact billed (e.g. chart type), used for per-kind statistics.
    pub artifact_kind: Option<String>,
    pub error_message: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::access_codes::Entity",
        from = "Column::AccessCodeId",
        to = "super::access_codes::Column::Id",
        on_delete = "Cascade"
    )]
    AccessCode,
}

impl Related<super::access_codes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AccessCode.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
