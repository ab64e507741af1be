use crate::ErrorSet;

// Client side failures, the codes are outside the http status range.

pub static HTTP_CLIENT_ERROR: ErrorSet = ErrorSet {
    err_message: "Http Client Error",
    http_error_code: 900,
};

pub static INVALID_JSON_REPLY: ErrorSet = ErrorSet {
    err_message: "Reply is not the expected json",
    http_error_code: 901,
};

pub static MISSING_CSRF_TOKEN: ErrorSet = ErrorSet {
    err_message: "No csrftoken cookie in the session",
    http_error_code: 902,
};

pub static UPLOAD_FILE_UNREADABLE: ErrorSet = ErrorSet {
    err_message: "Cannot read the file to upload",
    http_error_code: 903,
};

pub static INVALID_URL: ErrorSet = ErrorSet {
    err_message: "Invalid url",
    http_error_code: 904,
};

pub static LOGIN_FAILED: ErrorSet = ErrorSet {
    err_message: "Login failed, no session after the login form",
    http_error_code: 905,
};

pub static INVALID_CAPABILITIES: ErrorSet = ErrorSet {
    err_message: "Not a WMS capabilities document",
    http_error_code: 906,
};
