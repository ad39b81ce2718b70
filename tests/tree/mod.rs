mod tests_changed_ranges;
mod tests_navigation;
