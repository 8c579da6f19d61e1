use chrono::{Duration, Utc};
use clap::Parser;
use fake::{
    faker::name::en::{FirstName, LastName},
    Fake,
};
use orgpay::{
    auth::AuthService,
    domain::{
        CreateFeeTypeRequest, CreateOfficerRequest, CreateOrganizationRequest, CreateStudentRequest,
        CreateUserRequest, HierarchyLevel, OfficerCapabilities, Organization, Semester, ALL_PROGRAMS,
    },
    repository::{
        AcademicRepository, FeeTypeRepository, OfficerRepository, OrganizationRepository,
        SqliteAcademicRepository, SqliteFeeTypeRepository, SqliteOfficerRepository,
        SqliteOrganizationRepository, SqliteStudentRepository, SqliteUserRepository,
        StudentRepository, UserRepository,
    },
};
use rand::Rng;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

#[derive(Parser, Debug)]
#[command(about = "Seed an orgpay database with a demo college")]
struct Args {
    /// Database URL
    #[arg(long, default_value = "sqlite://orgpay.db?mode=rwc")]
    database_url: String,

    /// Random students to create per course
    #[arg(long, default_value_t = 5)]
    students_per_course: usize,

    /// Password given to every seeded account
    #[arg(long, default_value = "Orgpay@123")]
    password: String,
}

const EMAIL_DOMAIN: &str = "psu.palawan.edu.ph";
const ACADEMIC_YEAR: &str = "2024-2025";

/// (code, name, program type)
const COURSES: &[(&str, &str, &str)] = &[
    ("BSCS", "BS Computer Science", "COMPUTER_SCIENCE"),
    ("BSIT", "BS Information Technology", "INFORMATION_TECHNOLOGY"),
    ("BSMB", "BS Marine Biology", "MARINE_BIOLOGY"),
    ("BSES", "BS Environmental Science", "ENVIRONMENTAL_SCIENCE"),
    ("BSMEDBIO", "BS Medical Biology", "MEDICAL_BIOLOGY"),
];

/// (code, name, program affiliation) for the program organizations under ALLORG.
const PROGRAM_ORGS: &[(&str, &str, &str)] = &[
    ("COMSCI", "Computer Science Society", "COMPUTER_SCIENCE"),
    ("IT", "Information Technology Society", "INFORMATION_TECHNOLOGY"),
    ("MARINEBIO", "Marine Biology Society", "MARINE_BIOLOGY"),
    ("ENVSCIENCE", "Environmental Science Society", "ENVIRONMENTAL_SCIENCE"),
    ("MEDBIO", "Medical Biology Society", "MEDICAL_BIOLOGY"),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    println!("Seeding {}", args.database_url);

    let db_pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&args.database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&db_pool).await?;

    let academic_repo = SqliteAcademicRepository::new(db_pool.clone());
    let organization_repo = SqliteOrganizationRepository::new(db_pool.clone());
    let fee_type_repo = SqliteFeeTypeRepository::new(db_pool.clone());

    let password_hash = AuthService::hash_password(&args.password).await?;

    // Academic structure
    let cas = academic_repo
        .create_college("CAS", "College of Arts and Sciences")
        .await?;
    let mut courses = Vec::new();
    for &(code, name, program) in COURSES {
        courses.push(academic_repo.create_course(code, name, program, cas.id).await?);
    }
    println!("Created {} courses under {}", courses.len(), cas.code);

    // Organization hierarchy
    let allorg = organization_repo
        .create(organization(
            "ALLORG",
            "All Organizations Council",
            HierarchyLevel::College,
            None,
            Some(ALL_PROGRAMS),
            Some(cas.id),
            "Main Office",
        ))
        .await?;

    let mut organizations = vec![allorg.clone()];
    for &(code, name, program) in PROGRAM_ORGS {
        let org = organization_repo
            .create(organization(
                code,
                name,
                HierarchyLevel::Program,
                Some(allorg.id),
                Some(program),
                None,
                &format!("{} Booth", code),
            ))
            .await?;
        organizations.push(org);
    }

    organizations.push(
        organization_repo
            .create(organization(
                "CSSG",
                "College Student Government",
                HierarchyLevel::College,
                None,
                None,
                Some(cas.id),
                "Student Center",
            ))
            .await?,
    );
    organizations.push(
        organization_repo
            .create(organization(
                "COMPENDIUM",
                "The Compendium",
                HierarchyLevel::College,
                None,
                None,
                Some(cas.id),
                "Publication Office",
            ))
            .await?,
    );
    println!("Created {} organizations", organizations.len());

    // Fees
    let mut tx = db_pool.begin().await?;
    for org in &organizations {
        fee_type_repo
            .create(
                &mut *tx,
                CreateFeeTypeRequest {
                    organization_id: org.id,
                    name: format!("{} Membership Fee", org.code),
                    amount_cents: 50_000,
                    description: format!("Semestral membership fee for {}", org.name),
                    academic_year: ACADEMIC_YEAR.to_string(),
                    semester: Semester::First,
                    applicable_year_levels: "ALL".to_string(),
                    deadline: Some(Utc::now() + Duration::days(60)),
                },
            )
            .await?;
    }
    fee_type_repo
        .create(
            &mut *tx,
            CreateFeeTypeRequest {
                organization_id: organizations[0].id,
                name: "Freshman Orientation Kit".to_string(),
                amount_cents: 15_000,
                description: "Orientation materials for first-year students".to_string(),
                academic_year: ACADEMIC_YEAR.to_string(),
                semester: Semester::First,
                applicable_year_levels: "1".to_string(),
                deadline: None,
            },
        )
        .await?;
    tx.commit().await?;
    println!("Created fees");

    // Officers: one per organization plus a super officer
    let mut seeded = 0;
    for org in &organizations {
        let username = format!("{}_officer", org.code.to_lowercase());
        seed_officer(
            &db_pool,
            &password_hash,
            &username,
            org,
            OfficerCapabilities {
                can_process_payments: true,
                can_void_payments: true,
                can_generate_reports: true,
                can_promote_officers: true,
            },
            false,
        )
        .await?;
        seeded += 1;
    }
    seed_officer(
        &db_pool,
        &password_hash,
        "admin",
        &allorg,
        OfficerCapabilities {
            can_process_payments: true,
            can_void_payments: true,
            can_generate_reports: true,
            can_promote_officers: true,
        },
        true,
    )
    .await?;
    println!("Created {} officers and 1 super officer", seeded);

    // Students
    let user_repo = SqliteUserRepository::new(db_pool.clone());
    let student_repo = SqliteStudentRepository::new(db_pool.clone());
    let mut rng = rand::thread_rng();
    let mut student_count = 0;

    for course in &courses {
        for _ in 0..args.students_per_course {
            student_count += 1;
            let first_name: String = FirstName().fake();
            let last_name: String = LastName().fake();
            let id_number = format!("2024-{:05}", student_count);
            let email = format!("{}@{}", id_number, EMAIL_DOMAIN);

            let mut tx = db_pool.begin().await?;
            let user_id = user_repo
                .create(
                    &mut *tx,
                    CreateUserRequest {
                        email: email.clone(),
                        username: id_number.clone(),
                        password_hash: password_hash.clone(),
                        first_name: first_name.clone(),
                        last_name: last_name.clone(),
                    },
                )
                .await?;
            student_repo
                .create(
                    &mut *tx,
                    CreateStudentRequest {
                        user_id,
                        student_id_number: id_number,
                        first_name,
                        middle_name: None,
                        last_name,
                        course_id: course.id,
                        year_level: rng.gen_range(1..=4),
                        email,
                        phone_number: format!("09{:09}", rng.gen_range(0..1_000_000_000u32)),
                        academic_year: ACADEMIC_YEAR.to_string(),
                        semester: Semester::First,
                    },
                )
                .await?;
            tx.commit().await?;
        }
    }
    println!("Created {} students", student_count);

    println!("Done. Every account uses the password '{}'.", args.password);

    Ok(())
}

fn organization(
    code: &str,
    name: &str,
    hierarchy_level: HierarchyLevel,
    parent_id: Option<i64>,
    program_affiliation: Option<&str>,
    college_id: Option<i64>,
    booth_location: &str,
) -> CreateOrganizationRequest {
    CreateOrganizationRequest {
        name: name.to_string(),
        code: code.to_string(),
        hierarchy_level,
        parent_id,
        program_affiliation: program_affiliation.map(str::to_string),
        college_id,
        fee_tier: "TIER_1".to_string(),
        description: format!("{} ({})", name, code),
        contact_email: format!("{}@{}", code.to_lowercase(), EMAIL_DOMAIN),
        contact_phone: String::new(),
        booth_location: booth_location.to_string(),
    }
}

async fn seed_officer(
    pool: &SqlitePool,
    password_hash: &str,
    username: &str,
    org: &Organization,
    capabilities: OfficerCapabilities,
    is_super_officer: bool,
) -> anyhow::Result<()> {
    let user_repo = SqliteUserRepository::new(pool.clone());
    let officer_repo = SqliteOfficerRepository::new(pool.clone());

    let first_name: String = FirstName().fake();
    let last_name: String = LastName().fake();
    let email = format!("{}@{}", username, EMAIL_DOMAIN);

    let mut tx = pool.begin().await?;
    let user_id = user_repo
        .create(
            &mut *tx,
            CreateUserRequest {
                email: email.clone(),
                username: username.to_string(),
                password_hash: password_hash.to_string(),
                first_name: first_name.clone(),
                last_name: last_name.clone(),
            },
        )
        .await?;
    officer_repo
        .create(
            &mut *tx,
            CreateOfficerRequest {
                user_id,
                employee_id: format!("{}_001", username.to_uppercase()),
                first_name,
                last_name,
                email,
                phone_number: String::new(),
                organization_id: org.id,
                role: if is_super_officer { "Administrator" } else { "Treasurer" }.to_string(),
                capabilities,
                is_super_officer,
            },
        )
        .await?;
    tx.commit().await?;

    Ok(())
}
