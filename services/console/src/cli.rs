//! Command line interface
//!
//! Connection settings come from `CLINIC_ADMIN_*` variables (see
//! `common::config`); `--base-url` and `--token-path` override them.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use common::UserRole;
use password::DEFAULT_OPTION_COUNT;
use search::{
    DoseNumber, Pagination, PatientFilters, PatientStatus, PatientType, PaymentFilters, Sex,
    VaccinationFilters,
};

use crate::devices::DeviceStatus;

#[derive(Parser, Debug)]
#[command(name = "clinic-admin")]
#[command(about = "Administration console for the clinic records API")]
#[command(version)]
pub struct Cli {
    /// API root, overriding CLINIC_ADMIN_BASE_URL
    #[arg(long, global = true, env = "CLINIC_ADMIN_BASE_URL")]
    pub base_url: Option<String>,

    /// Session file, overriding CLINIC_ADMIN_TOKEN_PATH
    #[arg(long, global = true, env = "CLINIC_ADMIN_TOKEN_PATH")]
    pub token_path: Option<PathBuf>,

    /// Answer yes to every confirmation prompt
    #[arg(short = 'y', long, global = true, default_value_t = false)]
    pub yes: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sign in and keep the session for later commands
    Login {
        #[arg(short, long)]
        username: String,
        /// Read from the terminal when omitted
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Sign out and forget the stored session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Generate or check passwords
    Password {
        #[command(subcommand)]
        command: PasswordCommand,
    },
    /// Manage staff accounts
    Users {
        #[command(subcommand)]
        command: UserCommand,
    },
    /// Approve or reject staff devices
    Devices {
        #[command(subcommand)]
        command: DeviceCommand,
    },
    /// Search clinic records
    Search {
        #[command(subcommand)]
        command: SearchCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum PasswordCommand {
    /// Print memorable passwords that satisfy the policy
    Generate {
        #[arg(short, long, default_value_t = DEFAULT_OPTION_COUNT)]
        count: usize,
    },
    /// Report every policy rule a password breaks
    Check { password: String },
}

#[derive(Subcommand, Debug)]
pub enum UserCommand {
    List,
    Create {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        full_name: Option<String>,
        #[arg(long, value_parser = parse_role, default_value = "staff")]
        role: UserRole,
        /// Generated when omitted
        #[arg(long)]
        password: Option<String>,
    },
    Activate { id: i64 },
    Deactivate { id: i64 },
    Delete { id: i64 },
    ResetPassword {
        id: i64,
        /// Generated when omitted
        #[arg(long)]
        password: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum DeviceCommand {
    List {
        #[arg(long)]
        status: Option<DeviceStatus>,
    },
    Approve { id: i64 },
    Reject { id: i64 },
}

#[derive(Subcommand, Debug)]
pub enum SearchCommand {
    Patients(PatientArgs),
    Vaccinations(VaccinationArgs),
    Payments(PaymentArgs),
}

#[derive(Args, Debug, Clone, Copy)]
pub struct PageArgs {
    #[arg(long, default_value_t = 1)]
    pub page: u32,
    /// Defaults to CLINIC_ADMIN_DEFAULT_PAGE_SIZE
    #[arg(long)]
    pub page_size: Option<u32>,
}

impl PageArgs {
    pub fn pagination(&self, default_page_size: u32) -> Pagination {
        Pagination::new(self.page, self.page_size.unwrap_or(default_page_size))
    }
}

#[derive(Args, Debug, Clone)]
pub struct PatientArgs {
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub sex: Option<Sex>,
    #[arg(long)]
    pub patient_type: Option<PatientType>,
    #[arg(long)]
    pub status: Option<PatientStatus>,
    #[arg(long)]
    pub age_min: Option<u32>,
    #[arg(long)]
    pub age_max: Option<u32>,
    #[arg(long)]
    pub created_from: Option<NaiveDate>,
    #[arg(long)]
    pub created_to: Option<NaiveDate>,
    #[command(flatten)]
    pub page: PageArgs,
}

impl PatientArgs {
    pub fn into_filters(self, default_page_size: u32) -> PatientFilters {
        PatientFilters {
            name: self.name,
            phone: self.phone,
            sex: self.sex,
            patient_type: self.patient_type,
            status: self.status,
            age_min: self.age_min,
            age_max: self.age_max,
            created_from: self.created_from,
            created_to: self.created_to,
            facility_id: None,
            pagination: self.page.pagination(default_page_size),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct VaccinationArgs {
    #[arg(long)]
    pub patient_name: Option<String>,
    #[arg(long)]
    pub patient_phone: Option<String>,
    #[arg(long)]
    pub vaccine_name: Option<String>,
    /// "1st dose", "2nd dose" or "3rd dose"
    #[arg(long)]
    pub dose_number: Option<DoseNumber>,
    #[arg(long)]
    pub batch_number: Option<String>,
    #[arg(long)]
    pub dose_date_from: Option<NaiveDate>,
    #[arg(long)]
    pub dose_date_to: Option<NaiveDate>,
    #[command(flatten)]
    pub page: PageArgs,
}

impl VaccinationArgs {
    pub fn into_filters(self, default_page_size: u32) -> VaccinationFilters {
        VaccinationFilters {
            patient_name: self.patient_name,
            patient_phone: self.patient_phone,
            vaccine_name: self.vaccine_name,
            dose_number: self.dose_number,
            batch_number: self.batch_number,
            dose_date_from: self.dose_date_from,
            dose_date_to: self.dose_date_to,
            facility_id: None,
            pagination: self.page.pagination(default_page_size),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct PaymentArgs {
    #[arg(long)]
    pub patient_name: Option<String>,
    #[arg(long)]
    pub patient_phone: Option<String>,
    #[arg(long)]
    pub vaccine_name: Option<String>,
    #[arg(long)]
    pub payment_method: Option<String>,
    #[arg(long)]
    pub reference_number: Option<String>,
    #[arg(long)]
    pub amount_min: Option<f64>,
    #[arg(long)]
    pub amount_max: Option<f64>,
    #[arg(long)]
    pub payment_date_from: Option<NaiveDate>,
    #[arg(long)]
    pub payment_date_to: Option<NaiveDate>,
    #[command(flatten)]
    pub page: PageArgs,
}

impl PaymentArgs {
    pub fn into_filters(self, default_page_size: u32) -> PaymentFilters {
        PaymentFilters {
            patient_name: self.patient_name,
            patient_phone: self.patient_phone,
            vaccine_name: self.vaccine_name,
            payment_method: self.payment_method,
            reference_number: self.reference_number,
            amount_min: self.amount_min,
            amount_max: self.amount_max,
            payment_date_from: self.payment_date_from,
            payment_date_to: self.payment_date_to,
            facility_id: None,
            pagination: self.page.pagination(default_page_size),
        }
    }
}

fn parse_role(s: &str) -> Result<UserRole, String> {
    match s.trim().to_ascii_lowercase().as_str() {
        "admin" => Ok(UserRole::Admin),
        "staff" => Ok(UserRole::Staff),
        other => Err(format!("invalid role '{}', expected admin or staff", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_patient_search_flags_become_filters() {
        let cli = Cli::try_parse_from([
            "clinic-admin",
            "search",
            "patients",
            "--name",
            "Ada",
            "--sex",
            "Female",
            "--created-from",
            "2024-01-01",
            "--page",
            "3",
        ])
        .expect("parse");

        let Command::Search {
            command: SearchCommand::Patients(args),
        } = cli.command
        else {
            panic!("expected patient search");
        };
        let filters = args.into_filters(25);
        assert_eq!(filters.name.as_deref(), Some("Ada"));
        assert_eq!(filters.sex, Some(Sex::Female));
        assert_eq!(
            filters.created_from,
            NaiveDate::from_ymd_opt(2024, 1, 1)
        );
        assert_eq!(filters.pagination, Pagination::new(3, 25));
    }

    #[test]
    fn test_dose_number_accepts_wire_text() {
        let cli = Cli::try_parse_from([
            "clinic-admin",
            "search",
            "vaccinations",
            "--dose-number",
            "2nd dose",
            "--page-size",
            "10",
        ])
        .expect("parse");

        let Command::Search {
            command: SearchCommand::Vaccinations(args),
        } = cli.command
        else {
            panic!("expected vaccination search");
        };
        let filters = args.into_filters(20);
        assert_eq!(filters.dose_number, Some(DoseNumber::Second));
        assert_eq!(filters.pagination.page_size, 10);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(
            Cli::try_parse_from(["clinic-admin", "search", "patients", "--sex", "other"]).is_err()
        );
        assert!(
            Cli::try_parse_from([
                "clinic-admin",
                "users",
                "create",
                "--username",
                "ada",
                "--email",
                "ada@clinic.test",
                "--role",
                "owner"
            ])
            .is_err()
        );
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from(["clinic-admin", "users", "delete", "4", "-y"]).expect("parse");
        assert!(cli.yes);
        assert!(matches!(
            cli.command,
            Command::Users {
                command: UserCommand::Delete { id: 4 }
            }
        ));
    }
}
