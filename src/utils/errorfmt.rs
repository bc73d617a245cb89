use std::{
    error::Error,
    fmt::{Display, Formatter},
};

/// Prints an error followed by every error in its `source` chain.
pub struct ErrorFmt<E>(pub E);

impl<E: Error> Display for ErrorFmt<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut e_opt = Some(&self.0 as &dyn Error);
        let mut first = true;
        while let Some(e) = e_opt {
            if !first {
                f.write_str(": ")?;
            }
            write!(f, "{}", e)?;
            first = false;
            e_opt = e.source();
        }
        Ok(())
    }
}
