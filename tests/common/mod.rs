#![allow(dead_code)]

use std::{collections::HashMap, path::PathBuf, str::FromStr, sync::Arc, time::Duration};

use orgpay::{
    auth::AuthService,
    config::Settings,
    domain::{
        Course, CreateFeeTypeRequest, CreateOfficerRequest, CreateOrganizationRequest,
        CreateStudentRequest, CreateUserRequest, FeeType, HierarchyLevel, Officer,
        OfficerCapabilities, Organization, Semester, Student, ALL_PROGRAMS,
    },
    service::ServiceContext,
};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    SqlitePool,
};
use uuid::Uuid;

pub const PASSWORD: &str = "correct-horse-battery";

/// In-memory database with migrations applied. A single connection keeps
/// every query on the same memory database.
pub async fn test_pool() -> anyhow::Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

/// Database file under the temp dir shared by several connections, for tests
/// that need writers to actually race. Pass the path to `remove_database`
/// when done.
pub async fn file_pool(connections: u32) -> anyhow::Result<(SqlitePool, PathBuf)> {
    let path = std::env::temp_dir().join(format!("orgpay-{}.db", Uuid::new_v4()));
    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", path.display()))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(connections)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok((pool, path))
}

pub async fn remove_database(pool: SqlitePool, path: PathBuf) {
    pool.close().await;
    for suffix in ["", "-wal", "-shm"] {
        let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
    }
}

/// A small college used across the integration tests:
///
/// ```text
/// ALLORG (COLLEGE, ALL, CAS)      CSSG (COLLEGE, CAS)      JPIA (PROGRAM, ACCOUNTANCY)
/// ├── COMSCI (COMPUTER_SCIENCE)
/// ├── MARINEBIO (MARINE_BIOLOGY)
/// ├── IT (INFORMATION_TECHNOLOGY)
/// └── NOPROG (PROGRAM, no affiliation)
/// ```
pub struct TestApp {
    pub pool: SqlitePool,
    pub ctx: Arc<ServiceContext>,
    pub settings: Arc<Settings>,
    pub organizations: HashMap<&'static str, Organization>,
    pub courses: HashMap<&'static str, Course>,
    password_hash: String,
}

impl TestApp {
    pub async fn new() -> anyhow::Result<Self> {
        Self::with_pool(test_pool().await?).await
    }

    pub async fn with_pool(pool: SqlitePool) -> anyhow::Result<Self> {
        let settings = Settings::default();
        let ctx = Arc::new(ServiceContext::new(pool.clone(), &settings));

        let cas = ctx.academic_repo.create_college("CAS", "College of Arts and Sciences").await?;
        let cba = ctx.academic_repo.create_college("CBA", "College of Business").await?;

        let mut courses = HashMap::new();
        for (code, program, college_id) in [
            ("BSCS", "COMPUTER_SCIENCE", cas.id),
            ("BSMB", "MARINE_BIOLOGY", cas.id),
            ("BSIT", "INFORMATION_TECHNOLOGY", cas.id),
            ("BSA", "ACCOUNTANCY", cba.id),
        ] {
            let course = ctx
                .academic_repo
                .create_course(code, &format!("BS {}", program), program, college_id)
                .await?;
            courses.insert(code, course);
        }

        let mut organizations = HashMap::new();
        let allorg = ctx
            .organization_repo
            .create(org("ALLORG", HierarchyLevel::College, None, Some(ALL_PROGRAMS), Some(cas.id)))
            .await?;
        for (code, program) in [
            ("COMSCI", Some("COMPUTER_SCIENCE")),
            ("MARINEBIO", Some("MARINE_BIOLOGY")),
            ("IT", Some("INFORMATION_TECHNOLOGY")),
            ("NOPROG", None),
        ] {
            let child = ctx
                .organization_repo
                .create(org(code, HierarchyLevel::Program, Some(allorg.id), program, None))
                .await?;
            organizations.insert(code, child);
        }
        organizations.insert("ALLORG", allorg);

        let cssg = ctx
            .organization_repo
            .create(org("CSSG", HierarchyLevel::College, None, None, Some(cas.id)))
            .await?;
        organizations.insert("CSSG", cssg);

        let jpia = ctx
            .organization_repo
            .create(org("JPIA", HierarchyLevel::Program, None, Some("ACCOUNTANCY"), None))
            .await?;
        organizations.insert("JPIA", jpia);

        let password_hash = AuthService::hash_password(PASSWORD).await?;

        Ok(Self {
            pool,
            ctx,
            settings: Arc::new(settings),
            organizations,
            courses,
            password_hash,
        })
    }

    pub fn org(&self, code: &str) -> &Organization {
        self.organizations
            .get(code)
            .unwrap_or_else(|| panic!("no organization {}", code))
    }

    pub fn course(&self, code: &str) -> &Course {
        self.courses
            .get(code)
            .unwrap_or_else(|| panic!("no course {}", code))
    }

    async fn user(&self, username: &str, email: &str) -> anyhow::Result<i64> {
        let mut conn = self.pool.acquire().await?;
        let id = self
            .ctx
            .user_repo
            .create(
                &mut *conn,
                CreateUserRequest {
                    email: email.to_string(),
                    username: username.to_string(),
                    password_hash: self.password_hash.clone(),
                    first_name: username.to_string(),
                    last_name: "Tester".to_string(),
                },
            )
            .await?;
        Ok(id)
    }

    pub async fn student(&self, id_number: &str, course_code: &str, year_level: i64) -> anyhow::Result<Student> {
        let email = format!("{}@psu.palawan.edu.ph", id_number);
        let user_id = self.user(id_number, &email).await?;

        let mut conn = self.pool.acquire().await?;
        let id = self
            .ctx
            .student_repo
            .create(
                &mut *conn,
                CreateStudentRequest {
                    user_id,
                    student_id_number: id_number.to_string(),
                    first_name: "Student".to_string(),
                    middle_name: None,
                    last_name: id_number.to_string(),
                    course_id: self.course(course_code).id,
                    year_level,
                    email,
                    phone_number: String::new(),
                    academic_year: "2024-2025".to_string(),
                    semester: Semester::First,
                },
            )
            .await?;
        drop(conn);

        Ok(self.ctx.student_repo.find_by_id(id).await?.expect("student just created"))
    }

    pub async fn officer(
        &self,
        username: &str,
        org_code: &str,
        capabilities: OfficerCapabilities,
        is_super_officer: bool,
    ) -> anyhow::Result<Officer> {
        let email = format!("{}@psu.palawan.edu.ph", username);
        let user_id = self.user(username, &email).await?;

        let mut conn = self.pool.acquire().await?;
        let id = self
            .ctx
            .officer_repo
            .create(
                &mut *conn,
                CreateOfficerRequest {
                    user_id,
                    employee_id: username.to_uppercase(),
                    first_name: username.to_string(),
                    last_name: "Officer".to_string(),
                    email,
                    phone_number: String::new(),
                    organization_id: self.org(org_code).id,
                    role: "Treasurer".to_string(),
                    capabilities,
                    is_super_officer,
                },
            )
            .await?;
        drop(conn);

        Ok(self.ctx.officer_repo.find_by_id(id).await?.expect("officer just created"))
    }

    pub async fn fee(&self, org_code: &str, name: &str, amount_cents: i64, year_levels: &str) -> anyhow::Result<FeeType> {
        let mut conn = self.pool.acquire().await?;
        let id = self
            .ctx
            .fee_type_repo
            .create(
                &mut *conn,
                CreateFeeTypeRequest {
                    organization_id: self.org(org_code).id,
                    name: name.to_string(),
                    amount_cents,
                    description: String::new(),
                    academic_year: "2024-2025".to_string(),
                    semester: Semester::First,
                    applicable_year_levels: year_levels.to_string(),
                    deadline: None,
                },
            )
            .await?;
        drop(conn);

        Ok(self.ctx.fee_type_repo.find_by_id(id).await?.expect("fee type just created"))
    }
}

pub fn all_capabilities() -> OfficerCapabilities {
    OfficerCapabilities {
        can_process_payments: true,
        can_void_payments: true,
        can_generate_reports: true,
        can_promote_officers: true,
    }
}

pub fn cashier() -> OfficerCapabilities {
    OfficerCapabilities {
        can_process_payments: true,
        ..OfficerCapabilities::none()
    }
}

fn org(
    code: &str,
    hierarchy_level: HierarchyLevel,
    parent_id: Option<i64>,
    program_affiliation: Option<&str>,
    college_id: Option<i64>,
) -> CreateOrganizationRequest {
    CreateOrganizationRequest {
        name: format!("{} Organization", code),
        code: code.to_string(),
        hierarchy_level,
        parent_id,
        program_affiliation: program_affiliation.map(str::to_string),
        college_id,
        fee_tier: "TIER_1".to_string(),
        description: String::new(),
        contact_email: String::new(),
        contact_phone: String::new(),
        booth_location: format!("{} Booth", code),
    }
}
