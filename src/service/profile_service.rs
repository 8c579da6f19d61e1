use std::sync::Arc;

use sqlx::SqlitePool;

use crate::{
    auth::AuthService,
    domain::{
        actions, CreateStudentRequest, CreateUserRequest, NewActivityLog, Semester, Student,
        UpdateStudentRequest, MAX_YEAR_LEVEL, MIN_YEAR_LEVEL,
    },
    error::{AppError, Result},
    repository::{AcademicRepository, ActivityLogRepository, StudentRepository, UserRepository},
};

pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub course_code: Option<String>,
    pub year_level: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub student_id_number: String,
    pub course_code: String,
    pub year_level: i64,
    pub phone_number: String,
    pub academic_year: String,
    pub semester: Semester,
}

pub struct ProfileService {
    pool: SqlitePool,
    user_repo: Arc<dyn UserRepository>,
    academic_repo: Arc<dyn AcademicRepository>,
    student_repo: Arc<dyn StudentRepository>,
    activity_log_repo: Arc<dyn ActivityLogRepository>,
    allowed_email_domain: String,
}

impl ProfileService {
    pub fn new(
        pool: SqlitePool,
        user_repo: Arc<dyn UserRepository>,
        academic_repo: Arc<dyn AcademicRepository>,
        student_repo: Arc<dyn StudentRepository>,
        activity_log_repo: Arc<dyn ActivityLogRepository>,
        allowed_email_domain: String,
    ) -> Self {
        Self {
            pool,
            user_repo,
            academic_repo,
            student_repo,
            activity_log_repo,
            allowed_email_domain: allowed_email_domain.to_lowercase(),
        }
    }

    pub async fn update_profile(&self, student: &Student, update: ProfileUpdate) -> Result<Student> {
        if let Some(level) = update.year_level {
            validate_year_level(level)?;
        }

        let course_id = match update.course_code.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => Some(self.course_id_for(code).await?),
            _ => None,
        };

        let email = update.email.map(|e| e.trim().to_lowercase()).filter(|e| !e.is_empty());
        if let Some(email) = email.as_deref() {
            if let Some(other) = self.student_repo.find_by_email(email).await? {
                if other.id != student.id {
                    return Err(AppError::Conflict("That email address is already in use".to_string()));
                }
            }
        }

        let changes = UpdateStudentRequest {
            phone_number: update.phone_number.map(|p| p.trim().to_string()),
            email,
            course_id,
            year_level: update.year_level,
        };

        let mut tx = self.pool.begin().await?;

        self.student_repo.update(&mut *tx, student.id, changes).await?;
        self.activity_log_repo
            .append(
                &mut *tx,
                NewActivityLog::new(
                    student.user_id,
                    actions::PROFILE_UPDATED,
                    "Student updated their profile information",
                ),
            )
            .await?;

        tx.commit().await?;

        self.student_repo
            .find_by_id(student.id)
            .await?
            .ok_or_else(|| AppError::missing_profile("student"))
    }

    /// Self-registration, limited to the institutional email domain.
    pub async fn register(&self, registration: Registration) -> Result<Student> {
        let email = registration.email.trim().to_lowercase();
        if !email.ends_with(&self.allowed_email_domain) {
            return Err(AppError::Validation(format!(
                "Registration is restricted to {} addresses",
                self.allowed_email_domain
            )));
        }
        if registration.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::Validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        validate_year_level(registration.year_level)?;

        let course_id = self.course_id_for(registration.course_code.trim()).await?;

        if self.user_repo.find_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict("An account with this email already exists".to_string()));
        }
        if self.user_repo.find_by_username(registration.username.trim()).await?.is_some() {
            return Err(AppError::Conflict("That username is taken".to_string()));
        }

        let password_hash = AuthService::hash_password(&registration.password).await?;

        let mut tx = self.pool.begin().await?;

        let user_id = self
            .user_repo
            .create(
                &mut *tx,
                CreateUserRequest {
                    email: email.clone(),
                    username: registration.username.trim().to_string(),
                    password_hash,
                    first_name: registration.first_name.clone(),
                    last_name: registration.last_name.clone(),
                },
            )
            .await?;

        let student_id = self
            .student_repo
            .create(
                &mut *tx,
                CreateStudentRequest {
                    user_id,
                    student_id_number: registration.student_id_number.trim().to_string(),
                    first_name: registration.first_name,
                    middle_name: registration.middle_name.filter(|m| !m.trim().is_empty()),
                    last_name: registration.last_name,
                    course_id,
                    year_level: registration.year_level,
                    email,
                    phone_number: registration.phone_number,
                    academic_year: registration.academic_year,
                    semester: registration.semester,
                },
            )
            .await?;

        self.activity_log_repo
            .append(
                &mut *tx,
                NewActivityLog::new(
                    user_id,
                    actions::STUDENT_REGISTERED,
                    format!("Student {} registered", registration.student_id_number.trim()),
                ),
            )
            .await?;

        tx.commit().await?;

        tracing::info!("Registered student {}", student_id);

        self.student_repo
            .find_by_id(student_id)
            .await?
            .ok_or_else(|| AppError::Database("Failed to retrieve registered student".to_string()))
    }

    async fn course_id_for(&self, code: &str) -> Result<i64> {
        self.academic_repo
            .find_course_by_code(code)
            .await?
            .map(|course| course.id)
            .ok_or_else(|| AppError::Validation(format!("Unknown course code: {}", code)))
    }
}

fn validate_year_level(level: i64) -> Result<()> {
    if (MIN_YEAR_LEVEL..=MAX_YEAR_LEVEL).contains(&level) {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "Year level must be between {} and {}",
            MIN_YEAR_LEVEL, MAX_YEAR_LEVEL
        )))
    }
}
