mod test_adapter_faults;
mod test_unknown_kinds;
