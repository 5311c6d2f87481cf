use std::str::FromStr;
use std::time::Duration;
use anyhow::Result;

pub fn opt<T: FromStr>(arg: Option<&str>) -> Result<Option<T>> {
    Ok(arg.map(|s| T::from_str(s).map_err(|_| {
        let msg  = format!("invalid argument value '{}'", s);
        let kind = clap::ErrorKind::InvalidValue;
        clap::Error::with_description(&msg, kind)
    })).transpose()?)
}

/// Parses an optional whole number of seconds.
pub fn secs(arg: Option<&str>) -> Result<Option<Duration>> {
    Ok(opt::<u64>(arg)?.map(Duration::from_secs))
}

#[cfg(test)]
mod test {
    use std::time::Duration;
    use crate::capture::Kind;
    use super::{opt, secs};

    #[test]
    fn parse_options() {
        assert_eq!(Some(Kind::Pnet), opt::<Kind>(Some("PNET")).unwrap());
        assert_eq!(None, opt::<u16>(None).unwrap());
        assert!(opt::<u16>(Some("70000")).is_err());
        assert_eq!(Some(Duration::from_secs(90)), secs(Some("90")).unwrap());
        assert!(secs(Some("1m")).is_err());
    }
}
