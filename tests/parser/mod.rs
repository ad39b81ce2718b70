mod tests_errors;
mod tests_external;
mod tests_limits;
mod tests_parse;
