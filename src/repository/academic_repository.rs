use async_trait::async_trait;
use sqlx::{FromRow, SqlitePool};

use crate::{
    domain::{College, Course},
    error::{AppError, Result},
    repository::AcademicRepository,
};

#[derive(FromRow)]
struct CourseRow {
    id: i64,
    code: String,
    name: String,
    program_type: String,
    college_id: i64,
}

impl From<CourseRow> for Course {
    fn from(row: CourseRow) -> Self {
        Course {
            id: row.id,
            code: row.code,
            name: row.name,
            program_type: row.program_type,
            college_id: row.college_id,
        }
    }
}

pub struct SqliteAcademicRepository {
    pool: SqlitePool,
}

impl SqliteAcademicRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AcademicRepository for SqliteAcademicRepository {
    async fn create_college(&self, code: &str, name: &str) -> Result<College> {
        let result = sqlx::query("INSERT INTO colleges (code, name) VALUES (?, ?)")
            .bind(code)
            .bind(name)
            .execute(&self.pool)
            .await?;

        Ok(College {
            id: result.last_insert_rowid(),
            code: code.to_string(),
            name: name.to_string(),
        })
    }

    async fn create_course(&self, code: &str, name: &str, program_type: &str, college_id: i64) -> Result<Course> {
        let result = sqlx::query(
            "INSERT INTO courses (code, name, program_type, college_id) VALUES (?, ?, ?, ?)"
        )
        .bind(code)
        .bind(name)
        .bind(program_type)
        .bind(college_id)
        .execute(&self.pool)
        .await?;

        self.find_course_by_id(result.last_insert_rowid())
            .await?
            .ok_or_else(|| AppError::Database("Failed to retrieve created course".to_string()))
    }

    async fn find_course_by_id(&self, id: i64) -> Result<Option<Course>> {
        let row = sqlx::query_as::<_, CourseRow>(
            "SELECT id, code, name, program_type, college_id FROM courses WHERE id = ?"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn find_course_by_code(&self, code: &str) -> Result<Option<Course>> {
        let row = sqlx::query_as::<_, CourseRow>(
            "SELECT id, code, name, program_type, college_id FROM courses WHERE code = ?"
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }
}
