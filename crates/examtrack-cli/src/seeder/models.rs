//! Seeding configuration and row shapes.

use chrono::{DateTime, Utc};
use examtrack_models::UserRole;
use uuid::Uuid;

/// Departments seeded users, students and sessions are spread over.
pub const DEPARTMENTS: &[(&str, &str)] = &[
    ("Computer Science", "CSC"),
    ("Mathematics", "MTH"),
    ("Physics", "PHY"),
    ("Economics", "ECO"),
    ("Civil Engineering", "CVE"),
    ("English", "ENG"),
];

/// Staff accounts per department and role.
#[derive(Clone, Debug)]
pub struct StaffPerDepartment {
    pub department_heads: usize,
    pub faculty_officers: usize,
    pub lecturers: usize,
    pub invigilators: usize,
}

impl Default for StaffPerDepartment {
    fn default() -> Self {
        Self {
            department_heads: 1,
            faculty_officers: 1,
            lecturers: 4,
            invigilators: 6,
        }
    }
}

impl StaffPerDepartment {
    pub fn total(&self) -> usize {
        self.department_heads + self.faculty_officers + self.lecturers + self.invigilators
    }

    pub fn roles(&self) -> Vec<(UserRole, usize)> {
        vec![
            (UserRole::DepartmentHead, self.department_heads),
            (UserRole::FacultyOfficer, self.faculty_officers),
            (UserRole::Lecturer, self.lecturers),
            (UserRole::Invigilator, self.invigilators),
        ]
    }
}

#[derive(Clone, Debug)]
pub struct SeedConfig {
    /// How many entries of [`DEPARTMENTS`] to use
    pub departments: usize,
    pub staff: StaffPerDepartment,
    pub students_per_department: usize,
    pub exam_sessions_per_department: usize,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            departments: 3,
            staff: StaffPerDepartment::default(),
            students_per_department: 50,
            exam_sessions_per_department: 4,
        }
    }
}

impl SeedConfig {
    pub fn departments(&self) -> &'static [(&'static str, &'static str)] {
        &DEPARTMENTS[..self.departments.clamp(1, DEPARTMENTS.len())]
    }
}

pub struct UserSeed {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
    pub department: String,
    pub staff_number: String,
}

pub struct StudentSeed {
    pub matric_number: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub department: String,
    pub level: i32,
}

pub struct ExamSessionSeed {
    pub course_code: String,
    pub course_title: String,
    pub department: String,
    pub venue: String,
    pub starts_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub expected_scripts: i32,
    pub invigilator_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_departments_are_clamped() {
        let config = SeedConfig {
            departments: 100,
            ..SeedConfig::default()
        };
        assert_eq!(config.departments().len(), DEPARTMENTS.len());

        let config = SeedConfig {
            departments: 0,
            ..SeedConfig::default()
        };
        assert_eq!(config.departments().len(), 1);
    }

    #[test]
    fn test_staff_total() {
        assert_eq!(StaffPerDepartment::default().total(), 12);
    }
}
