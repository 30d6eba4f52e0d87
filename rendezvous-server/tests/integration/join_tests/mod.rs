mod test_join_policy;
mod test_join_validation;
