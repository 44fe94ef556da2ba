//! Continuation tokens: the `custom_id` strings carried by buttons, select menus and
//! modals. Everything a component handler needs to resume work is encoded in the token
//! itself, so no session state is kept between the message going out and the click
//! coming back.
//!
//! Wire form: `{domain}_{action}_{param}...`. Domain and action come from the route
//! table below and never contain the delimiter. Params are escaped (`%` as `%25`, `_`
//! as `%5F`) so free-form values such as mode ids survive the round trip.

use std::fmt;

use thiserror::Error;

pub const DELIMITER: char = '_';
/// Platform limit on a component `custom_id`.
pub const MAX_TOKEN_LEN: usize = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Domain {
    Flights,
    Register,
    InitServer,
    Pirep,
    Pilot,
}

impl Domain {
    pub const ALL: [Domain; 5] =
        [Domain::Flights, Domain::Register, Domain::InitServer, Domain::Pirep, Domain::Pilot];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flights => "flights",
            Self::Register => "register",
            Self::InitServer => "initserver",
            Self::Pirep => "pirep",
            Self::Pilot => "pilot",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|domain| domain.as_str() == value)
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The UI element a token is attached to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Button,
    SelectMenu,
    Modal,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RouteSpec {
    pub domain: Domain,
    pub action: &'static str,
    pub params: &'static [&'static str],
    pub kind: ComponentKind,
}

impl RouteSpec {
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

const fn spec(
    domain: Domain,
    action: &'static str,
    params: &'static [&'static str],
    kind: ComponentKind,
) -> RouteSpec {
    RouteSpec { domain, action, params, kind }
}

/// Every `(domain, action)` the bot emits, with its param arity and component kind.
pub const ROUTES: &[RouteSpec] = &[
    spec(Domain::Flights, "prev", &["ifc_id", "page"], ComponentKind::Button),
    spec(Domain::Flights, "next", &["ifc_id", "page"], ComponentKind::Button),
    spec(Domain::Register, "new", &[], ComponentKind::Button),
    spec(Domain::Register, "link", &[], ComponentKind::Button),
    spec(Domain::Register, "submit", &[], ComponentKind::Modal),
    spec(Domain::Register, "linksubmit", &[], ComponentKind::Modal),
    spec(Domain::InitServer, "proceed", &[], ComponentKind::Button),
    spec(Domain::InitServer, "submit", &[], ComponentKind::Modal),
    spec(Domain::Pirep, "mode", &["mode_id"], ComponentKind::Button),
    spec(Domain::Pirep, "submit", &["mode_id"], ComponentKind::Modal),
    spec(Domain::Pilot, "sync", &["target_user_id"], ComponentKind::Modal),
    spec(Domain::Pilot, "role", &["target_user_id"], ComponentKind::SelectMenu),
];

pub fn route_spec(domain: Domain, action: &str) -> Option<&'static RouteSpec> {
    ROUTES.iter().find(|spec| spec.domain == domain && spec.action == action)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContinuationToken {
    pub domain: Domain,
    pub action: String,
    pub params: Vec<String>,
}

impl ContinuationToken {
    pub fn spec(&self) -> Option<&'static RouteSpec> {
        route_spec(self.domain, &self.action)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EncodeError {
    #[error("field `{field}` value `{value}` is not allowed in a continuation token")]
    IllegalFieldValue { field: &'static str, value: String },
    #[error("no route `{domain}_{action}`")]
    UnknownRoute { domain: Domain, action: String },
    #[error("route `{domain}_{action}` takes {expected} params, got {actual}")]
    ArityMismatch { domain: Domain, action: String, expected: usize, actual: usize },
    #[error("encoded token is {len} characters, limit is {MAX_TOKEN_LEN}")]
    TooLong { len: usize },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unknown token domain `{0}`")]
    UnknownDomain(String),
    #[error("unknown action `{action}` for domain `{domain}`")]
    UnknownAction { domain: Domain, action: String },
    #[error("malformed token `{token}`: {reason}")]
    MalformedToken { token: String, reason: String },
}

impl DecodeError {
    fn malformed(token: &str, reason: impl Into<String>) -> Self {
        Self::MalformedToken { token: token.to_owned(), reason: reason.into() }
    }
}

pub fn encode(domain: Domain, action: &str, params: &[&str]) -> Result<String, EncodeError> {
    if action.is_empty() || action.contains(DELIMITER) {
        return Err(EncodeError::IllegalFieldValue { field: "action", value: action.to_owned() });
    }

    let spec = route_spec(domain, action)
        .ok_or_else(|| EncodeError::UnknownRoute { domain, action: action.to_owned() })?;
    if spec.arity() != params.len() {
        return Err(EncodeError::ArityMismatch {
            domain,
            action: action.to_owned(),
            expected: spec.arity(),
            actual: params.len(),
        });
    }

    let mut token = String::with_capacity(MAX_TOKEN_LEN);
    token.push_str(domain.as_str());
    token.push(DELIMITER);
    token.push_str(action);
    for param in params {
        token.push(DELIMITER);
        escape_into(param, &mut token);
    }

    let len = token.chars().count();
    if len > MAX_TOKEN_LEN {
        return Err(EncodeError::TooLong { len });
    }

    Ok(token)
}

/// Pure function of the input string.
pub fn decode(token: &str) -> Result<ContinuationToken, DecodeError> {
    let mut fields = token.split(DELIMITER);

    let domain_field = fields.next().unwrap_or_default();
    let domain = Domain::parse(domain_field)
        .ok_or_else(|| DecodeError::UnknownDomain(domain_field.to_owned()))?;

    let action = fields.next().ok_or_else(|| DecodeError::malformed(token, "missing action"))?;
    let spec = route_spec(domain, action)
        .ok_or_else(|| DecodeError::UnknownAction { domain, action: action.to_owned() })?;

    let params = fields
        .map(|field| {
            unescape(field).ok_or_else(|| DecodeError::malformed(token, "invalid escape sequence"))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if params.len() != spec.arity() {
        return Err(DecodeError::malformed(
            token,
            format!("expected {} params, found {}", spec.arity(), params.len()),
        ));
    }

    Ok(ContinuationToken { domain, action: action.to_owned(), params })
}

fn escape_into(value: &str, out: &mut String) {
    for ch in value.chars() {
        match ch {
            '%' => out.push_str("%25"),
            DELIMITER => out.push_str("%5F"),
            other => out.push(other),
        }
    }
}

fn unescape(value: &str) -> Option<String> {
    let bytes = value.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut index = 0usize;

    while index < bytes.len() {
        match bytes[index] {
            b'%' => {
                if index + 2 >= bytes.len() {
                    return None;
                }
                let high = hex_nibble(bytes[index + 1])?;
                let low = hex_nibble(bytes[index + 2])?;
                decoded.push((high << 4) | low);
                index += 3;
            }
            byte => {
                decoded.push(byte);
                index += 1;
            }
        }
    }

    String::from_utf8(decoded).ok()
}

fn hex_nibble(value: u8) -> Option<u8> {
    match value {
        b'0'..=b'9' => Some(value - b'0'),
        b'a'..=b'f' => Some(value - b'a' + 10),
        b'A'..=b'F' => Some(value - b'A' + 10),
        _ => None,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageDirection {
    Previous,
    Next,
}

/// A decoded token checked against its route and converted to typed params.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ComponentRoute {
    FlightsPage { direction: PageDirection, ifc_id: String, page: u32 },
    RegisterNew,
    RegisterLink,
    RegisterSubmit,
    RegisterLinkSubmit,
    InitServerProceed,
    InitServerSubmit,
    PirepMode { mode_id: String },
    PirepSubmit { mode_id: String },
    PilotSync { target_user_id: String },
    PilotRole { target_user_id: String },
}

impl ComponentRoute {
    pub fn domain(&self) -> Domain {
        match self {
            Self::FlightsPage { .. } => Domain::Flights,
            Self::RegisterNew
            | Self::RegisterLink
            | Self::RegisterSubmit
            | Self::RegisterLinkSubmit => Domain::Register,
            Self::InitServerProceed | Self::InitServerSubmit => Domain::InitServer,
            Self::PirepMode { .. } | Self::PirepSubmit { .. } => Domain::Pirep,
            Self::PilotSync { .. } | Self::PilotRole { .. } => Domain::Pilot,
        }
    }

    pub fn action(&self) -> &'static str {
        match self {
            Self::FlightsPage { direction: PageDirection::Previous, .. } => "prev",
            Self::FlightsPage { direction: PageDirection::Next, .. } => "next",
            Self::RegisterNew => "new",
            Self::RegisterLink => "link",
            Self::RegisterSubmit => "submit",
            Self::RegisterLinkSubmit => "linksubmit",
            Self::InitServerProceed => "proceed",
            Self::InitServerSubmit => "submit",
            Self::PirepMode { .. } => "mode",
            Self::PirepSubmit { .. } => "submit",
            Self::PilotSync { .. } => "sync",
            Self::PilotRole { .. } => "role",
        }
    }

    pub fn kind(&self) -> ComponentKind {
        route_spec(self.domain(), self.action()).map_or(ComponentKind::Button, |spec| spec.kind)
    }

    /// Encodes the route as a `custom_id`.
    pub fn token(&self) -> Result<String, EncodeError> {
        let page;
        let params: Vec<&str> = match self {
            Self::FlightsPage { ifc_id, page: number, .. } => {
                page = number.to_string();
                vec![ifc_id.as_str(), page.as_str()]
            }
            Self::PirepMode { mode_id } | Self::PirepSubmit { mode_id } => vec![mode_id.as_str()],
            Self::PilotSync { target_user_id } | Self::PilotRole { target_user_id } => {
                vec![target_user_id.as_str()]
            }
            Self::RegisterNew
            | Self::RegisterLink
            | Self::RegisterSubmit
            | Self::RegisterLinkSubmit
            | Self::InitServerProceed
            | Self::InitServerSubmit => Vec::new(),
        };
        encode(self.domain(), self.action(), &params)
    }
}

impl TryFrom<&ContinuationToken> for ComponentRoute {
    type Error = DecodeError;

    fn try_from(token: &ContinuationToken) -> Result<Self, Self::Error> {
        let malformed = |reason: &str| DecodeError::MalformedToken {
            token: format!("{}{DELIMITER}{}", token.domain, token.action),
            reason: reason.to_owned(),
        };
        let param = |index: usize| {
            token.params.get(index).cloned().ok_or_else(|| malformed("missing param"))
        };

        let route = match (token.domain, token.action.as_str()) {
            (Domain::Flights, action @ ("prev" | "next")) => {
                let page = param(1)?
                    .parse::<u32>()
                    .ok()
                    .filter(|page| *page >= 1)
                    .ok_or_else(|| malformed("page must be a positive integer"))?;
                let direction =
                    if action == "prev" { PageDirection::Previous } else { PageDirection::Next };
                Self::FlightsPage { direction, ifc_id: param(0)?, page }
            }
            (Domain::Register, "new") => Self::RegisterNew,
            (Domain::Register, "link") => Self::RegisterLink,
            (Domain::Register, "submit") => Self::RegisterSubmit,
            (Domain::Register, "linksubmit") => Self::RegisterLinkSubmit,
            (Domain::InitServer, "proceed") => Self::InitServerProceed,
            (Domain::InitServer, "submit") => Self::InitServerSubmit,
            (Domain::Pirep, "mode") => Self::PirepMode { mode_id: param(0)? },
            (Domain::Pirep, "submit") => Self::PirepSubmit { mode_id: param(0)? },
            (Domain::Pilot, "sync") => Self::PilotSync { target_user_id: param(0)? },
            (Domain::Pilot, "role") => Self::PilotRole { target_user_id: param(0)? },
            (domain, action) => {
                return Err(DecodeError::UnknownAction { domain, action: action.to_owned() })
            }
        };

        Ok(route)
    }
}
