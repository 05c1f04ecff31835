mod test_client;
mod test_gateway;
mod test_preview;
