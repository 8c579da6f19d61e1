use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use crate::{
    domain::{AccessScope, CreateStudentRequest, Semester, Student, UpdateStudentRequest},
    error::{AppError, Result},
    repository::{push_id_list, to_utc, StudentRepository},
};

#[derive(FromRow)]
struct StudentRow {
    id: i64,
    user_id: i64,
    student_id_number: String,
    first_name: String,
    middle_name: Option<String>,
    last_name: String,
    course_id: i64,
    year_level: i64,
    email: String,
    phone_number: String,
    academic_year: String,
    semester: String,
    is_active: i64,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

const STUDENT_COLUMNS: &str = r#"
    s.id, s.user_id, s.student_id_number, s.first_name, s.middle_name,
    s.last_name, s.course_id, s.year_level, s.email, s.phone_number,
    s.academic_year, s.semester, s.is_active, s.created_at, s.updated_at
"#;

pub struct SqliteStudentRepository {
    pool: SqlitePool,
}

impl SqliteStudentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_student(row: StudentRow) -> Result<Student> {
        let semester = Semester::from_str(&row.semester)
            .ok_or_else(|| AppError::Database(format!("Invalid semester: {}", row.semester)))?;

        Ok(Student {
            id: row.id,
            user_id: row.user_id,
            student_id_number: row.student_id_number,
            first_name: row.first_name,
            middle_name: row.middle_name,
            last_name: row.last_name,
            course_id: row.course_id,
            year_level: row.year_level,
            email: row.email,
            phone_number: row.phone_number,
            academic_year: row.academic_year,
            semester,
            is_active: row.is_active != 0,
            created_at: to_utc(row.created_at),
            updated_at: to_utc(row.updated_at),
        })
    }
}

#[async_trait]
impl StudentRepository for SqliteStudentRepository {
    async fn create(&self, conn: &mut SqliteConnection, student: CreateStudentRequest) -> Result<i64> {
        let now = Utc::now().naive_utc();

        let result = sqlx::query(
            r#"
            INSERT INTO students (
                user_id, student_id_number, first_name, middle_name, last_name,
                course_id, year_level, email, phone_number, academic_year,
                semester, is_active, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?)
            "#
        )
        .bind(student.user_id)
        .bind(&student.student_id_number)
        .bind(&student.first_name)
        .bind(&student.middle_name)
        .bind(&student.last_name)
        .bind(student.course_id)
        .bind(student.year_level)
        .bind(&student.email)
        .bind(&student.phone_number)
        .bind(&student.academic_year)
        .bind(student.semester.as_str())
        .bind(now)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Student>> {
        let sql = format!("SELECT {} FROM students s WHERE s.id = ?", STUDENT_COLUMNS);
        let row = sqlx::query_as::<_, StudentRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_student).transpose()
    }

    async fn find_by_user(&self, user_id: i64) -> Result<Option<Student>> {
        let sql = format!("SELECT {} FROM students s WHERE s.user_id = ?", STUDENT_COLUMNS);
        let row = sqlx::query_as::<_, StudentRow>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_student).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Student>> {
        let sql = format!("SELECT {} FROM students s WHERE s.email = ?", STUDENT_COLUMNS);
        let row = sqlx::query_as::<_, StudentRow>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_student).transpose()
    }

    async fn list_in_scope(&self, scope: &AccessScope) -> Result<Vec<Student>> {
        if scope.covers_no_students() {
            return Ok(Vec::new());
        }

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {} FROM students s JOIN courses c ON c.id = s.course_id WHERE s.is_active = 1",
            STUDENT_COLUMNS
        ));

        if !scope.unrestricted {
            qb.push(" AND (");
            let mut has_clause = false;
            if !scope.program_types.is_empty() {
                qb.push("UPPER(TRIM(c.program_type)) IN (");
                let mut separated = qb.separated(", ");
                for program in &scope.program_types {
                    separated.push_bind(program.clone());
                }
                separated.push_unseparated(")");
                has_clause = true;
            }
            if !scope.college_ids.is_empty() {
                if has_clause {
                    qb.push(" OR ");
                }
                push_id_list(&mut qb, "c.college_id", scope.college_ids.iter().copied());
            }
            qb.push(")");
        }

        qb.push(" ORDER BY s.last_name, s.first_name");

        let rows = qb.build_query_as::<StudentRow>()
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::row_to_student).collect()
    }

    async fn update(&self, conn: &mut SqliteConnection, id: i64, update: UpdateStudentRequest) -> Result<()> {
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            UPDATE students
            SET phone_number = COALESCE(?, phone_number),
                email = COALESCE(?, email),
                course_id = COALESCE(?, course_id),
                year_level = COALESCE(?, year_level),
                updated_at = ?
            WHERE id = ?
            "#
        )
        .bind(&update.phone_number)
        .bind(&update.email)
        .bind(update.course_id)
        .bind(update.year_level)
        .bind(now)
        .bind(id)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }
}
