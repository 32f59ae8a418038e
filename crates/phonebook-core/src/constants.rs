/// Route component constants shared across crates
pub const API_ROUTE_COMPONENT: &str = "api";
pub const API_ROUTE_PREFIX: &str = const_str::concat!("/", API_ROUTE_COMPONENT);

pub const SOAP_ROUTE_COMPONENT: &str = "tms/soap";
pub const SOAP_ROUTE_PREFIX: &str = const_str::concat!("/", SOAP_ROUTE_COMPONENT);

pub const JSON_SEARCH_ROUTE_COMPONENT: &str = "json/search";
pub const JSON_SEARCH_ROUTE_PREFIX: &str = const_str::concat!("/", JSON_SEARCH_ROUTE_COMPONENT);

/// PhoneBookSearch XML namespace spoken by video endpoints.
pub const PHONEBOOK_NAMESPACE: &str = "http://www.tandberg.net/2004/06/PhoneBookSearch/";

/// `SOAPAction` header value of a phonebook search request.
pub const PHONEBOOK_SEARCH_ACTION: &str = const_str::concat!(PHONEBOOK_NAMESPACE, "Search");

pub const SOAP_ENVELOPE_NAMESPACE: &str = "http://schemas.xmlsoap.org/soap/envelope/";

/// Page size used when a search request does not carry `MaxResult`.
pub const DEFAULT_SEARCH_LIMIT: usize = 20;

/// Separator used when joining canonical group paths.
pub const PATH_SEPARATOR: &str = " > ";

/// Upper bound on catalogs visited while walking an upstream phonebook.
pub const MAX_UPSTREAM_CATALOGS: usize = 10_000;

/// Maximum stored length of group and item titles.
pub const MAX_TITLE_LEN: usize = 255;
