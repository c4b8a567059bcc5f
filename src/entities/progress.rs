use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-(user, course) learning progress. `version` is an optimistic lock
/// bumped on every write; concurrent writers lose on a stale version.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "progress")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    /// Cumulative watched seconds across distinct modules.
    pub watched_time_secs: i64,
    /// Completion percentage, clamped to [0, 100].
    pub progress: i16,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub mod watched_module {
    //! Set container for watched modules. The composite primary key makes
    //! replaying an already-watched module a storage-level no-op.

    use chrono::{DateTime, Utc};
    use sea_orm::entity::prelude::*;
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "watched_modules")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub progress_id: Uuid,
        #[sea_orm(primary_key, auto_increment = false)]
        pub module_id: Uuid,
        pub watched_at: DateTime<Utc>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(
            belongs_to = "super::Entity",
            from = "Column::ProgressId",
            to = "super::Column::Id"
        )]
        Progress,
    }

    impl Related<super::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Progress.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    #[sea_orm(
        belongs_to = "super::course::Entity",
        from = "Column::CourseId",
        to = "super::course::Column::Id"
    )]
    Course,
    #[sea_orm(has_many = "watched_module::Entity")]
    WatchedModules,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::course::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Course.def()
    }
}

impl Related<watched_module::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WatchedModules.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
