use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20250101_000001_create_tables::Migration)]
    }
}

mod m20250101_000001_create_tables {
    use sea_orm_migration::prelude::*;

    #[derive(DeriveMigrationName)]
    pub struct Migration;

    #[derive(Iden)]
    enum Users {
        Table,
        Id,
        Name,
        Email,
        Role,
        PlatformFee,
        Profits,
        Active,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    enum Courses {
        Table,
        Id,
        InstructorId,
        Title,
        PriceAmount,
        PriceCurrency,
        DurationHours,
        DurationMinutes,
        DurationSeconds,
        RatingsAverage,
        RatingsQuantity,
        Profits,
        Published,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    enum Sections {
        Table,
        Id,
        CourseId,
        Title,
        Position,
    }

    #[derive(Iden)]
    enum CourseModules {
        Table,
        Id,
        CourseId,
        SectionId,
        Title,
        DurationHours,
        DurationMinutes,
        DurationSeconds,
    }

    #[derive(Iden)]
    enum Reviews {
        Table,
        Id,
        UserId,
        CourseId,
        Rate,
        Comment,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    enum Transactions {
        Table,
        Id,
        UserId,
        CourseId,
        PhoneNumber,
        CoursePriceAmount,
        CoursePriceCurrency,
        Amount,
        DiscountAmount,
        CouponId,
        Status,
        Enrolled,
        RejectionReason,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    enum CourseEnrollments {
        Table,
        CourseId,
        UserId,
        TransactionId,
        EnrolledAt,
    }

    #[derive(Iden)]
    enum Coupons {
        Table,
        Id,
        Code,
        Discount,
        ExpiresAt,
        MaximumUses,
        Uses,
        CourseId,
        CreatedAt,
    }

    #[derive(Iden)]
    enum Progress {
        Table,
        Id,
        UserId,
        CourseId,
        WatchedTimeSecs,
        Progress,
        Version,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    enum WatchedModules {
        Table,
        ProgressId,
        ModuleId,
        WatchedAt,
    }

    #[derive(Iden)]
    enum Certificates {
        Table,
        Id,
        UserId,
        CourseId,
        Url,
        Score,
        SerialNumber,
        Issuer,
        CreatedAt,
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Users::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Users::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(Users::Name).string().not_null())
                        .col(
                            ColumnDef::new(Users::Email)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Users::Role).string_len(32).not_null())
                        .col(
                            ColumnDef::new(Users::PlatformFee)
                                .decimal_len(5, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Users::Profits)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Users::Active)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Users::CreatedAt).timestamp_with_time_zone().not_null())
                        .col(ColumnDef::new(Users::UpdatedAt).timestamp_with_time_zone().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Courses::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Courses::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(Courses::InstructorId).uuid().not_null())
                        .col(ColumnDef::new(Courses::Title).string().not_null())
                        .col(
                            ColumnDef::new(Courses::PriceAmount)
                                .decimal_len(12, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Courses::PriceCurrency)
                                .string_len(3)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Courses::DurationHours)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Courses::DurationMinutes)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Courses::DurationSeconds)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Courses::RatingsAverage)
                                .decimal_len(3, 1)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Courses::RatingsQuantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Courses::Profits)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Courses::Published)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Courses::CreatedAt).timestamp_with_time_zone().not_null())
                        .col(ColumnDef::new(Courses::UpdatedAt).timestamp_with_time_zone().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_courses_instructor")
                                .from(Courses::Table, Courses::InstructorId)
                                .to(Users::Table, Users::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Sections::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Sections::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(Sections::CourseId).uuid().not_null())
                        .col(ColumnDef::new(Sections::Title).string().not_null())
                        .col(
                            ColumnDef::new(Sections::Position)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_sections_course")
                                .from(Sections::Table, Sections::CourseId)
                                .to(Courses::Table, Courses::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(CourseModules::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(CourseModules::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(CourseModules::CourseId).uuid().not_null())
                        .col(ColumnDef::new(CourseModules::SectionId).uuid())
                        .col(ColumnDef::new(CourseModules::Title).string().not_null())
                        .col(
                            ColumnDef::new(CourseModules::DurationHours)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(CourseModules::DurationMinutes)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(CourseModules::DurationSeconds)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_modules_course")
                                .from(CourseModules::Table, CourseModules::CourseId)
                                .to(Courses::Table, Courses::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_modules_section")
                                .from(CourseModules::Table, CourseModules::SectionId)
                                .to(Sections::Table, Sections::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Reviews::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Reviews::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(Reviews::UserId).uuid().not_null())
                        .col(ColumnDef::new(Reviews::CourseId).uuid().not_null())
                        .col(ColumnDef::new(Reviews::Rate).small_integer().not_null())
                        .col(ColumnDef::new(Reviews::Comment).text())
                        .col(
                            ColumnDef::new(Reviews::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Reviews::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_reviews_user")
                                .from(Reviews::Table, Reviews::UserId)
                                .to(Users::Table, Users::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_reviews_course")
                                .from(Reviews::Table, Reviews::CourseId)
                                .to(Courses::Table, Courses::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;
            // One review per user per course.
            manager
                .create_index(
                    Index::create()
                        .name("idx_reviews_user_course")
                        .table(Reviews::Table)
                        .col(Reviews::UserId)
                        .col(Reviews::CourseId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Coupons::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Coupons::Id).uuid().not_null().primary_key())
                        .col(
                            ColumnDef::new(Coupons::Code)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(Coupons::Discount)
                                .decimal_len(5, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Coupons::ExpiresAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Coupons::MaximumUses).integer())
                        .col(
                            ColumnDef::new(Coupons::Uses)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Coupons::CourseId).uuid().not_null())
                        .col(
                            ColumnDef::new(Coupons::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_coupons_course")
                                .from(Coupons::Table, Coupons::CourseId)
                                .to(Courses::Table, Courses::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Transactions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Transactions::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Transactions::UserId).uuid().not_null())
                        .col(ColumnDef::new(Transactions::CourseId).uuid().not_null())
                        .col(ColumnDef::new(Transactions::PhoneNumber).string().not_null())
                        .col(
                            ColumnDef::new(Transactions::CoursePriceAmount)
                                .decimal_len(12, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Transactions::CoursePriceCurrency)
                                .string_len(3)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Transactions::Amount).big_integer().not_null())
                        .col(
                            ColumnDef::new(Transactions::DiscountAmount)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Transactions::CouponId).uuid())
                        .col(ColumnDef::new(Transactions::Status).string_len(32).not_null())
                        .col(
                            ColumnDef::new(Transactions::Enrolled)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Transactions::RejectionReason).text())
                        .col(
                            ColumnDef::new(Transactions::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Transactions::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_transactions_user")
                                .from(Transactions::Table, Transactions::UserId)
                                .to(Users::Table, Users::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_transactions_course")
                                .from(Transactions::Table, Transactions::CourseId)
                                .to(Courses::Table, Courses::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_transactions_coupon")
                                .from(Transactions::Table, Transactions::CouponId)
                                .to(Coupons::Table, Coupons::Id),
                        )
                        .to_owned(),
                )
                .await?;
            manager
                .create_index(
                    Index::create()
                        .name("idx_transactions_status")
                        .table(Transactions::Table)
                        .col(Transactions::Status)
                        .to_owned(),
                )
                .await?;
            manager
                .create_index(
                    Index::create()
                        .name("idx_transactions_user")
                        .table(Transactions::Table)
                        .col(Transactions::UserId)
                        .to_owned(),
                )
                .await?;

            // Composite primary key doubles as the enrolled-users set and
            // the guard against double enrollment.
            manager
                .create_table(
                    Table::create()
                        .table(CourseEnrollments::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(CourseEnrollments::CourseId).uuid().not_null())
                        .col(ColumnDef::new(CourseEnrollments::UserId).uuid().not_null())
                        .col(
                            ColumnDef::new(CourseEnrollments::TransactionId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CourseEnrollments::EnrolledAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .primary_key(
                            Index::create()
                                .col(CourseEnrollments::CourseId)
                                .col(CourseEnrollments::UserId),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_enrollments_course")
                                .from(CourseEnrollments::Table, CourseEnrollments::CourseId)
                                .to(Courses::Table, Courses::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_enrollments_user")
                                .from(CourseEnrollments::Table, CourseEnrollments::UserId)
                                .to(Users::Table, Users::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_enrollments_transaction")
                                .from(CourseEnrollments::Table, CourseEnrollments::TransactionId)
                                .to(Transactions::Table, Transactions::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Progress::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Progress::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(Progress::UserId).uuid().not_null())
                        .col(ColumnDef::new(Progress::CourseId).uuid().not_null())
                        .col(
                            ColumnDef::new(Progress::WatchedTimeSecs)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Progress::Progress)
                                .small_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Progress::Version)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Progress::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Progress::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_progress_user")
                                .from(Progress::Table, Progress::UserId)
                                .to(Users::Table, Users::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_progress_course")
                                .from(Progress::Table, Progress::CourseId)
                                .to(Courses::Table, Courses::Id),
                        )
                        .to_owned(),
                )
                .await?;
            manager
                .create_index(
                    Index::create()
                        .name("idx_progress_user_course")
                        .table(Progress::Table)
                        .col(Progress::UserId)
                        .col(Progress::CourseId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(WatchedModules::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(WatchedModules::ProgressId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(WatchedModules::ModuleId).uuid().not_null())
                        .col(
                            ColumnDef::new(WatchedModules::WatchedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .primary_key(
                            Index::create()
                                .col(WatchedModules::ProgressId)
                                .col(WatchedModules::ModuleId),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_watched_progress")
                                .from(WatchedModules::Table, WatchedModules::ProgressId)
                                .to(Progress::Table, Progress::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_watched_module")
                                .from(WatchedModules::Table, WatchedModules::ModuleId)
                                .to(CourseModules::Table, CourseModules::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Certificates::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Certificates::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Certificates::UserId).uuid().not_null())
                        .col(ColumnDef::new(Certificates::CourseId).uuid().not_null())
                        .col(ColumnDef::new(Certificates::Url).string().not_null())
                        .col(ColumnDef::new(Certificates::Score).small_integer().not_null())
                        .col(
                            ColumnDef::new(Certificates::SerialNumber)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Certificates::Issuer).string().not_null())
                        .col(
                            ColumnDef::new(Certificates::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_certificates_user")
                                .from(Certificates::Table, Certificates::UserId)
                                .to(Users::Table, Users::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_certificates_course")
                                .from(Certificates::Table, Certificates::CourseId)
                                .to(Courses::Table, Courses::Id),
                        )
                        .to_owned(),
                )
                .await?;
            manager
                .create_index(
                    Index::create()
                        .name("idx_certificates_user_course")
                        .table(Certificates::Table)
                        .col(Certificates::UserId)
                        .col(Certificates::CourseId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Certificates::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(WatchedModules::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Progress::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(CourseEnrollments::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Transactions::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Coupons::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Reviews::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(CourseModules::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Sections::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Courses::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Users::Table).to_owned())
                .await?;
            Ok(())
        }
    }
}
