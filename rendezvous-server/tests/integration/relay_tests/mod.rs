mod test_broadcast_relay;
mod test_relay_rejections;
mod test_targeted_relay;
