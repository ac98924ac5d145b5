use diesel::result::{DatabaseErrorKind, Error as DieselError};

error_chain! {
    errors {
        NotFound(what: String) {
            description("entity not found")
            display("{} not found", what)
        }

        AlreadyExists(msg: String) {
            description("entity already exists")
            display("{}", msg)
        }

        InvalidArgument(msg: String) {
            description("invalid argument")
            display("{}", msg)
        }

        Unauthorized(msg: String) {
            description("unauthorized")
            display("{}", msg)
        }

        Storage {
            description("storage failure")
            display("storage failure")
        }

        Pool {
            description("no database connection available")
            display("no database connection available")
        }

        Credentials {
            description("credential failure")
            display("credential failure")
        }
    }
}

impl From<DieselError> for Error {
    fn from(err: DieselError) -> Error {
        match err {
            DieselError::NotFound => ErrorKind::NotFound("record".into()).into(),
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                debug!(detail = info.message(), "unique constraint rejected write");
                ErrorKind::AlreadyExists("record already exists".into()).into()
            }
            other => {
                error!(error = %other, "storage failure");
                Error::with_chain(other, ErrorKind::Storage)
            }
        }
    }
}

impl From<::r2d2::Error> for Error {
    fn from(err: ::r2d2::Error) -> Error {
        error!(error = %err, "database connection unavailable");
        Error::with_chain(err, ErrorKind::Pool)
    }
}

impl Error {
    /// Errors outside the public taxonomy; adapters report these without detail.
    pub fn is_internal(&self) -> bool {
        !matches!(
            self.kind(),
            ErrorKind::NotFound(_)
                | ErrorKind::AlreadyExists(_)
                | ErrorKind::InvalidArgument(_)
                | ErrorKind::Unauthorized(_)
        )
    }

    pub fn public_message(&self) -> String {
        if self.is_internal() {
            "internal error".to_string()
        } else {
            self.to_string()
        }
    }
}

pub(crate) fn not_found<S: Into<String>>(what: S) -> Error {
    let what = what.into();
    debug!(what = %what, "lookup missed");
    ErrorKind::NotFound(what).into()
}

pub(crate) fn already_exists<S: Into<String>>(msg: S) -> Error {
    ErrorKind::AlreadyExists(msg.into()).into()
}

pub(crate) fn invalid_argument<S: Into<String>>(msg: S) -> Error {
    ErrorKind::InvalidArgument(msg.into()).into()
}

pub(crate) fn unauthorized<S: Into<String>>(msg: S) -> Error {
    ErrorKind::Unauthorized(msg.into()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diesel_not_found_maps_to_not_found() {
        let err: Error = DieselError::NotFound.into();
        match err.kind() {
            ErrorKind::NotFound(_) => {}
            other => panic!("unexpected kind: {:?}", other),
        }
        assert!(!err.is_internal());
    }

    #[test]
    fn other_diesel_errors_are_internal() {
        let err: Error = DieselError::RollbackTransaction.into();
        assert!(err.is_internal());
        assert_eq!(err.public_message(), "internal error");
    }

    #[test]
    fn taxonomy_messages_are_public() {
        let err = invalid_argument("Invalid email: nope");
        assert_eq!(err.public_message(), "Invalid email: nope");
    }
}
